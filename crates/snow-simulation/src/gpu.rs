//! Device handle with failure tracking
//!
//! wgpu reports most failures out of band: validation and allocation errors go
//! to error scopes, device loss to a callback. `GpuContext` folds both back into
//! `DeviceError` values at the point where the orchestrator waits for work.

use crate::error::DeviceError;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    lost: Arc<Mutex<Option<String>>>,
}

impl GpuContext {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let lost = Arc::new(Mutex::new(None));

        let flag = Arc::clone(&lost);
        device.set_device_lost_callback(move |reason, message| {
            log::error!("Device lost ({:?}): {}", reason, message);
            if let Ok(mut lost) = flag.lock() {
                *lost = Some(format!("{reason:?}: {message}"));
            }
        });

        Self {
            device,
            queue,
            lost,
        }
    }

    /// Fails once the device has been lost.
    pub fn check_lost(&self) -> Result<(), DeviceError> {
        match self.lost.lock() {
            Ok(lost) => match lost.as_ref() {
                Some(message) => Err(DeviceError::Lost(message.clone())),
                None => Ok(()),
            },
            Err(_) => Err(DeviceError::Internal(
                "device-lost flag poisoned".to_string(),
            )),
        }
    }

    /// Run `work` inside out-of-memory and validation error scopes.
    ///
    /// Any error raised by `work` comes back as a `DeviceError` instead of
    /// reaching the uncaptured error handler.
    pub fn scoped<T>(&self, work: impl FnOnce() -> T) -> Result<T, DeviceError> {
        self.check_lost()?;

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let output = work();

        // Scopes pop in reverse push order.
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());

        if let Some(error) = out_of_memory {
            return Err(error.into());
        }
        if let Some(error) = validation {
            return Err(error.into());
        }
        self.check_lost()?;
        Ok(output)
    }

    /// Encode one command buffer, submit it and block until the device has
    /// finished executing it. Resources created while encoding share the
    /// same error scopes.
    pub fn submit_and_wait(
        &self,
        label: &str,
        encode: impl FnOnce(&mut wgpu::CommandEncoder),
    ) -> Result<(), DeviceError> {
        let poll = self.scoped(|| {
            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });
            encode(&mut encoder);
            let submission = self.queue.submit(std::iter::once(encoder.finish()));

            self.device.poll(wgpu::PollType::Wait {
                submission_index: Some(submission),
                timeout: None,
            })
        })?;
        poll?;
        Ok(())
    }
}
