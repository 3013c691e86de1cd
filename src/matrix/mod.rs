// Matrix input model and kernel layouts

pub mod csr;
pub mod ellpack;
pub mod input;
pub mod reference;

pub use csr::CsrLayout;
pub use ellpack::{EllpackLayout, EMPTY_ROW_PAD_COLUMN};
pub use input::SparseMatrixInput;
pub use reference::reference_spmv;
