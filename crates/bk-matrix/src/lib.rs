pub mod resolver;

pub use resolver::{resolve, BuildMatrix, MatrixEntry};
