//! Integration tests driving the octo-release binary

mod helpers;
mod test_create_release;
mod test_scan;
