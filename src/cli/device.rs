use burn::backend::libtorch::LibTorchDevice;

/// The first CUDA device when requested and available, otherwise the CPU
pub fn select(use_cuda: bool) -> LibTorchDevice {
    if use_cuda && tch::Cuda::is_available() {
        log::info!("Using CUDA device 0");

        return LibTorchDevice::Cuda(0);
    }

    if use_cuda {
        log::warn!("CUDA is not available, using CPU");
    } else {
        log::info!("Using CPU");
    }

    LibTorchDevice::Cpu
}
