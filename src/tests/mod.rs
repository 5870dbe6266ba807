pub mod tally_engine;
