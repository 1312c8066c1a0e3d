//! UniFFI bindgen binary for generating Kotlin bindings
//!
//! Usage:
//!   cargo run -p callsync-ffi --features bindgen --bin uniffi-bindgen generate \
//!       --library target/aarch64-linux-android/release/libcallsync_ffi.so \
//!       --language kotlin \
//!       --out-dir generated/kotlin

fn main() {
    uniffi::uniffi_bindgen_main()
}
