mod fee_accountant;
pub use fee_accountant::*;
