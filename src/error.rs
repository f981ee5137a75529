use thiserror::Error;

/// このクレートで使用する`Result`型。
pub type Result<T> = std::result::Result<T, Error>;

/// 学習・推論・保存の各処理で発生するエラー。
#[derive(Error, Debug)]
pub enum Error {
    /// サポートされていない損失関数名
    #[error("サポートされていない損失関数です: {0} (schrodinger, maxwell, heat, wave, navier_stokes)")]
    UnsupportedLoss(String),

    /// サポートされていない活性化関数名
    #[error("サポートされていない活性化関数です: {0} (relu, sigmoid, tanh, leaky_relu)")]
    UnsupportedActivation(String),

    /// 設定値の不整合
    #[error("設定が不正です: {0}")]
    InvalidConfig(String),

    /// 初期化後にゼロのパラメータが残っている
    #[error("ニューラルネットワークの初期化に失敗しました (値がゼロのパラメータがあります)")]
    InvalidInitialization,

    /// モデルファイルの行を数値として読めない
    #[error("モデルファイルの {line} 行目を読み込めません: {reason}")]
    ModelFormat { line: usize, reason: String },

    /// モデルファイルのパラメータ数がネットワーク構成と一致しない
    #[error("パラメータ数が一致しません: 期待値 {expected}, 実際 {found}")]
    ParameterCount { expected: usize, found: usize },

    /// 損失グラフの描画エラー
    #[error("グラフの描画に失敗しました: {0}")]
    Plot(String),

    #[error("I/Oエラー: {0}")]
    Io(#[from] std::io::Error),
}
