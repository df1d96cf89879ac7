pub mod commkey;
pub mod constants;
pub mod info_codec;
pub mod packet;
pub mod user_codec;
