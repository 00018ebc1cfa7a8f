//! client generated from `schema.graphql` at build time

#![allow(clippy::too_many_arguments)]

include!(concat!(env!("OUT_DIR"), "/client.rs"));
