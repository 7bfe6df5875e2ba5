use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{User, VoucherCode};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApplyVoucherRequest {
    pub code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AppliedVoucher {
    pub code: String,
    pub amount: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VoucherList {
    pub items: Vec<VoucherCode>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpsertVoucherRequest {
    pub email: String,
    pub code: String,
    pub amount: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteVoucherRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserVouchers {
    pub user: User,
    pub vouchers: Vec<VoucherCode>,
}
