//! Resource limits for the virtual machine.

use crate::error::ConfigError;

/// Operand stack slots.
pub const DEFAULT_STACK_SIZE: usize = 2048;
/// Global slots; also the most `OpGetGlobal`'s 2-byte operand can address.
pub const DEFAULT_GLOBALS_SIZE: usize = 65536;
pub const DEFAULT_MAX_FRAMES: usize = 1024;

/// Sizes of the VM's fixed-capacity stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    pub stack_size: usize,
    pub globals_size: usize,
    pub max_frames: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            globals_size: DEFAULT_GLOBALS_SIZE,
            max_frames: DEFAULT_MAX_FRAMES,
        }
    }
}

impl VmConfig {
    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }

    pub fn with_globals_size(mut self, globals_size: usize) -> Self {
        self.globals_size = globals_size;
        self
    }

    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stack_size == 0 {
            return Err(ConfigError::Zero("stack_size"));
        }
        if self.globals_size == 0 {
            return Err(ConfigError::Zero("globals_size"));
        }
        if self.max_frames == 0 {
            return Err(ConfigError::Zero("max_frames"));
        }
        if self.globals_size > DEFAULT_GLOBALS_SIZE {
            return Err(ConfigError::GlobalsTooLarge(self.globals_size));
        }
        Ok(())
    }
}
