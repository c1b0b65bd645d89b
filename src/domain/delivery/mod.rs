//! Delivery Context - 结果回传限界上下文

mod payload;

pub use payload::{
    DeliveryPayload, FailurePayload, SuccessPayload, ACTION_SAVE_USER_FILE, FILE_GROUP_EVENT,
    FILE_TYPE_WAV, STATUS_SUCCESS,
};
