#![allow(dead_code, unused_imports)]

pub use sitepipe_test_utils::builders;
pub use sitepipe_test_utils::fake_invoker::FakeInvoker;
pub use sitepipe_test_utils::{init_tracing, read_file, with_timeout, write_file};
