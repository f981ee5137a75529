//! # 物理情報ニューラルネットワーク (PINN) ライブラリ
//!
//! 偏微分方程式 (シュレディンガー, マクスウェル, 熱, 波動, ナビエ–ストークス) の
//! 残差を損失とし、2-5-3 の小さな全結合ネットワークを1サンプルずつ学習させるための
//! 主要なコンポーネントを提供します。

pub mod activation;
pub mod cli;
pub mod error;
pub mod inference;
pub mod model;
pub mod pinn;
pub mod plot;
pub mod record;
pub mod training;

pub use activation::Activation;
pub use error::{Error, Result};
pub use model::{Model, NetworkConfig};
pub use pinn::{LossKind, LossParameters};
pub use training::{EpochRecord, TrainingConfig, TrainingLog};

/// モデルを保存するファイル名
pub const MODEL_FILENAME: &str = "model_parameters.txt";
