// SPDX-License-Identifier: Apache-2.0

//! Truth tables for cut functions.
//!
//! `word6` works on a single `u64` (up to six variables), `table` on word
//! arrays up to `MAX_TT_VARS` variables and delegates to `word6` for the
//! variables inside a word. `funcs` interns tables and composes cut functions;
//! `dsd` estimates gate cost from a disjoint-support decomposition.

pub mod dsd;
pub mod funcs;
pub mod table;
pub mod word6;

pub use funcs::{FUNC_CONST0, FUNC_VAR0, FuncId, FuncTable};
pub use table::{MAX_TT_VARS, TruthTable};
