pub mod catalog;
pub mod config;
pub mod domain;
pub mod effect;
pub mod error;
pub mod http;
pub mod ingest;
pub mod ligand;
pub mod model;
pub mod output;
pub mod proteins;
pub mod providers;
pub mod pubchem;
pub mod publication;
pub mod rows;
pub mod store;
pub mod uniprot;
