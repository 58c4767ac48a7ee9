//! Symbol normalisation backed by external gene nomenclature.

pub mod hgnc;

pub use hgnc::HgncAliasTable;
