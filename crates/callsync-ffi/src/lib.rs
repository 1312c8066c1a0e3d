//! UniFFI bindings crate for the callsync library
//!
//! Wraps the callsync crate for UniFFI library-mode binding generation by
//! re-exporting its FFI module and scaffolding.
//!
//! ## Building for Android
//!
//! 1. Build the shared library per ABI (cargo-ndk):
//!    ```bash
//!    cargo ndk -t arm64-v8a -t armeabi-v7a -t x86_64 -o app/src/main/jniLibs \
//!        build --release -p callsync-ffi
//!    ```
//!
//! 2. Generate Kotlin bindings:
//!    ```bash
//!    cargo run -p callsync-ffi --features bindgen --bin uniffi-bindgen generate \
//!        --library target/aarch64-linux-android/release/libcallsync_ffi.so \
//!        --language kotlin \
//!        --out-dir generated/kotlin
//!    ```

pub use callsync::ffi::*;

// Library mode needs the scaffolding symbols in this cdylib
callsync::uniffi_reexport_scaffolding!();
