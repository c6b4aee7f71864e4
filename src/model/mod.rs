pub mod relational;
