pub mod traced_ops;
