//! Query methods, one file per table, all as `impl Database` blocks.

mod analyses;
mod capsules;
mod deliveries;
mod fragments;
