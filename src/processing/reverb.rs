//! Convolution reverb
//!
//! Both the dry signal and the impulse response are reduced to mono, the IR is
//! brought to the signal's sample rate, and the two are linearly convolved.

use std::path::Path;
use std::sync::Arc;
use log::{debug, info};
use ndarray::{Array1, ArrayView1};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use crate::audio::{load_audio, AudioConverter, AudioData, AudioFormat, WavAudio};
use crate::error::{ReverbError, Result};

/// Kernels up to this many taps are convolved directly in the time domain.
pub const DIRECT_KERNEL_LIMIT: usize = 64;

/// Load the impulse response at `ir_path` and convolve `signal` with it.
pub fn add_conv_reverb(signal: &AudioData, sample_rate: u32, ir_path: &Path) -> Result<Array1<f32>> {
    let ir = load_audio(ir_path)?;
    info!(
        "Loaded IR {}: {:.2}s, {} Hz, {} ch",
        ir_path.display(), ir.duration(), ir.sample_rate(), ir.channels()
    );
    apply_impulse_response(signal, sample_rate, &ir)
}

/// Convolve `signal` with an already decoded impulse response.
pub fn apply_impulse_response(signal: &AudioData, sample_rate: u32, ir: &WavAudio) -> Result<Array1<f32>> {
    let dry = signal.to_mono();
    let kernel = prepare_kernel(ir, sample_rate)?;
    debug!("Convolving {} samples with {} IR taps", dry.len(), kernel.len());
    convolve(dry.view(), kernel.view())
}

/// Mono IR at `sample_rate`.
fn prepare_kernel(ir: &WavAudio, sample_rate: u32) -> Result<Array1<f32>> {
    let mono = WavAudio::new_mono(ir.sample_rate(), ir.data().to_mono(), AudioFormat::Float32);
    if mono.sample_rate() == sample_rate {
        return Ok(mono.data().to_mono());
    }

    debug!("Resampling IR {} Hz -> {} Hz", mono.sample_rate(), sample_rate);
    let resampled = AudioConverter::convert_sample_rate(&mono, sample_rate)?;
    Ok(resampled.data().to_mono())
}

/// Full linear convolution, `signal.len() + kernel.len() - 1` samples long.
pub fn convolve(signal: ArrayView1<f32>, kernel: ArrayView1<f32>) -> Result<Array1<f32>> {
    if signal.is_empty() || kernel.is_empty() {
        return Err(ReverbError::processing(format!(
            "Cannot convolve empty signals (signal: {}, kernel: {})", signal.len(), kernel.len()
        )));
    }

    if kernel.len().min(signal.len()) <= DIRECT_KERNEL_LIMIT {
        Ok(convolve_direct(signal, kernel))
    } else {
        Ok(convolve_fft(signal, kernel))
    }
}

pub fn convolve_direct(signal: ArrayView1<f32>, kernel: ArrayView1<f32>) -> Array1<f32> {
    let mut output = Array1::<f32>::zeros(signal.len() + kernel.len() - 1);
    for (i, &x) in signal.iter().enumerate() {
        if x == 0.0 {
            continue;
        }
        for (j, &h) in kernel.iter().enumerate() {
            output[i + j] += x * h;
        }
    }
    output
}

/// Overlap-add FFT convolution.
///
/// The kernel spectrum is computed once; the signal is cut into blocks so
/// that block + kernel - 1 fits the FFT size, and block results are summed
/// into the output.
pub fn convolve_fft(signal: ArrayView1<f32>, kernel: ArrayView1<f32>) -> Array1<f32> {
    let out_len = signal.len() + kernel.len() - 1;
    let fft_len = (2 * kernel.len()).next_power_of_two().max(DIRECT_KERNEL_LIMIT * 2);
    let block_len = fft_len - kernel.len() + 1;

    let mut planner = FftPlanner::<f32>::new();
    let forward = planner.plan_fft_forward(fft_len);
    let inverse = planner.plan_fft_inverse(fft_len);

    let mut kernel_spectrum = vec![Complex::new(0.0f32, 0.0); fft_len];
    for (dst, &h) in kernel_spectrum.iter_mut().zip(kernel.iter()) {
        dst.re = h;
    }
    forward.process(&mut kernel_spectrum);

    let mut output = Array1::<f32>::zeros(out_len);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); fft_len];
    let scale = 1.0 / fft_len as f32;

    let mut start = 0;
    while start < signal.len() {
        let end = (start + block_len).min(signal.len());
        filter_block(&mut buffer, signal.slice(ndarray::s![start..end]), &kernel_spectrum, &forward, &inverse);

        let valid = (end - start + kernel.len() - 1).min(out_len - start);
        for (k, value) in buffer.iter().take(valid).enumerate() {
            output[start + k] += value.re * scale;
        }
        start = end;
    }

    output
}

fn filter_block(
    buffer: &mut [Complex<f32>],
    block: ArrayView1<f32>,
    kernel_spectrum: &[Complex<f32>],
    forward: &Arc<dyn Fft<f32>>,
    inverse: &Arc<dyn Fft<f32>>,
) {
    buffer.fill(Complex::new(0.0, 0.0));
    for (dst, &x) in buffer.iter_mut().zip(block.iter()) {
        dst.re = x;
    }
    forward.process(buffer);
    for (b, h) in buffer.iter_mut().zip(kernel_spectrum.iter()) {
        *b *= *h;
    }
    inverse.process(buffer);
}
