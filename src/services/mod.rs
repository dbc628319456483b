pub mod code;
pub mod redemption;
pub mod storage;
pub mod work_service;
pub mod work_store;
