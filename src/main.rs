//! # 物理情報ニューラルネットワーク (PINN) プログラム
//!
//! 偏微分方程式の残差にもとづく損失で小さなネットワークを学習させます。
//!
//! `clap` クレートを利用して、コマンドラインから`train`（学習）、`infer`（推論）、
//! `plot`（損失グラフの描画）の機能を個別に実行できます。
//!
//! ## 使い方
//!
//! ### 学習
//! ```bash
//! cargo run --release -- train --loss heat --activation tanh --epochs 1000 --learning-rate 0.01
//! ```
//!
//! ### 推論
//! ```bash
//! cargo run --release -- infer --activation tanh
//! ```
//!
//! ### 損失グラフ
//! ```bash
//! cargo run --release -- plot log_heat.txt
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use physics_pinn::cli::{Cli, Commands};
use physics_pinn::{inference, plot, training};
use tracing_subscriber::EnvFilter;

/// プログラムのエントリーポイント。
///
/// コマンドライン引数を解析し、各サブコマンドの処理に振り分けます。
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("physics_pinn=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Train(args) => training::run(args).context("学習に失敗しました")?,
        Commands::Infer(args) => inference::run(args).context("推論に失敗しました")?,
        Commands::Plot(args) => plot::run(args).context("グラフの描画に失敗しました")?,
    }

    Ok(())
}
