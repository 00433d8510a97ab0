//! Pose dataset tools
//!
//! Command-line utilities built on `posegan`.
//!
//! ## Available tools
//!
//! - `dataset_test`: load items and batches and print their statistics
//! - `precompute_poses`: fill the pose-map cache for every annotated image
//!
//! ## Usage
//!
//! ```bash
//! # Inspect a dataset described by a JSON config
//! cargo run --bin dataset_test -- --config dataset.json --num-samples 5
//!
//! # Warm the pose-map cache
//! cargo run --bin precompute_poses -- --config dataset.json
//! ```

pub mod config;

pub use config::{DatasetTestConfig, PrecomputeConfig};

cfg_if::cfg_if! {
    if #[cfg(feature = "wgpu")] {
        pub type SelectedBackend = burn::backend::Wgpu;
        pub type SelectedDevice = burn::backend::wgpu::WgpuDevice;
    } else if #[cfg(feature = "cuda")] {
        pub type SelectedBackend = burn::backend::Cuda;
        pub type SelectedDevice = burn::backend::cuda::CudaDevice;
    } else {
        pub type SelectedBackend = burn::backend::NdArray;
        pub type SelectedDevice = burn::backend::ndarray::NdArrayDevice;
    }
}

pub fn create_device() -> SelectedDevice {
    SelectedDevice::default()
}

pub const fn get_backend_name() -> &'static str {
    if cfg!(feature = "wgpu") {
        "WGPU"
    } else if cfg!(feature = "cuda") {
        "CUDA"
    } else {
        "NdArray"
    }
}

/// Initialise `env_logger`, defaulting to `info` when `RUST_LOG` is unset.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
