pub use lazy_message::LazyMessage;

mod lazy_message;
