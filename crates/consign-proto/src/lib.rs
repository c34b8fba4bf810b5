//! Generated protobuf and gRPC bindings for the Consign order service.
//!
//! The package layout mirrors the `.proto` package path, so message types
//! live under [`consign::v1`].

pub mod consign {
    pub mod v1 {
        tonic::include_proto!("consign.v1");
    }
}
