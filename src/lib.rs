// SPDX-License-Identifier: Apache-2.0

//! Delay-oriented K-LUT technology mapping with area recovery.
//!
//! A `SubjectGraph` of AND, XOR and MUX nodes (optionally with structural
//! choices) is covered by K-input LUTs. The `Mapper` enumerates priority cuts
//! per node and runs a fixed schedule of delay and area-recovery rounds; the
//! result is read back as a `MappedNetwork`.

pub mod aiger;
pub mod arena;
pub mod cut;
pub mod error;
pub mod graph;
pub mod library;
pub mod mapped;
pub mod mapper;
pub mod params;
pub mod sim;
pub mod store;
pub mod truth;

pub use error::MapError;
pub use graph::{NodeKind, NodeRef, Operand, SubjectGraph};
pub use library::LutLibrary;
pub use mapped::MappedNetwork;
pub use mapper::{MapStats, Mapper, Round};
pub use params::{FunctionMode, MapParams};
