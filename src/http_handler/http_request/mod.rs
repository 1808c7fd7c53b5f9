pub mod lop_post;
pub mod request_common;
pub mod solve_post;
