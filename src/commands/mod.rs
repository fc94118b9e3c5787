pub mod export;
pub mod print;

use crate::print_pipeline::PrintService;

/// 由 Tauri 托管的共享状态；每个请求仍然独占自己的渲染表面和临时文件
pub struct PrintState {
    pub service: PrintService,
}
