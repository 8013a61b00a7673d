pub mod dispatcher;
pub mod transcoder;
