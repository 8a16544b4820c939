pub mod bibliography;
