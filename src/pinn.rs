//! 物理方程式の残差にもとづく損失関数。
//!
//! 各損失関数は偏微分方程式の残差（方程式の各項を移項した結果、0になるべき値）を
//! 差分で近似し、その二乗をスカラーの損失として返します。

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// 電子の質量 (kg)
pub const ELECTRON_MASS: f64 = 9.10938356e-31;
/// 換算プランク定数 (J·s)
pub const HBAR: f64 = 1.0545718e-34;
/// 真空の誘電率 (F/m)
pub const EPSILON_0: f64 = 8.854187817e-12;
/// 真空の透磁率 (N/A^2)
pub const MU_0: f64 = 1.2566370614e-6;
/// ボルツマン定数 (J/K)
pub const K_B: f64 = 1.380649e-23;
/// 室温での空気の粘性係数 (Pa·s)
pub const ETA: f64 = 1.81e-5;
/// 空気中の音速 (m/s)
pub const WAVE_SPEED: f64 = 343.0;
/// 重力加速度 (m/s^2)
pub const G: f64 = 9.81;
/// 海面での空気の密度 (kg/m^3)
pub const RHO: f64 = 1.225;
/// ゼロ除算を防ぐための微小値
pub const EPSILON: f64 = 1e-10;
/// 境界条件・初期条件・質量保存の損失で使う固定の正規化係数
pub const NORMALIZATION_FACTOR: f64 = 1.0e-10;

/// 学習・検証で損失関数に渡す時間刻み
pub const TIME_STEP: f64 = 0.01;
/// 学習・検証で損失関数に渡す空間刻み
pub const SPACE_STEP: f64 = 0.1;

/// 損失の最大値を返します。ただし`1e-10`未満にはなりません。
pub fn adaptive_normalization(losses: &[f64]) -> f64 {
    let max_loss = losses.iter().fold(0.0_f64, |max, &loss| if loss > max { loss } else { max });
    if max_loss > EPSILON { max_loss } else { EPSILON }
}

/// 損失をその値自身のみを含む配列の正規化係数で割ります。
///
/// 実質的には `loss / max(loss, 1e-10)` であり、損失が下限を超えると常に1.0になります。
fn self_normalize(loss: f64) -> f64 {
    loss / adaptive_normalization(&[loss])
}

/// シュレディンガー方程式の損失 (単位: J^2)
pub fn schrodinger_equation_loss(psi: f64, psi_target: f64, potential: f64, time_step: f64) -> f64 {
    let difference = psi - psi_target;
    let kinetic_energy =
        -(HBAR * HBAR / (2.0 * ELECTRON_MASS)) * (difference / (time_step * time_step));
    let potential_energy = potential * psi;

    let loss = self_normalize(
        difference.powi(2) + kinetic_energy.powi(2) + potential_energy.powi(2),
    );

    // 損失曲面をなめらかにするための勾配ペナルティ
    let gradient_penalty = 0.01 * difference.powi(2);

    loss + gradient_penalty
}

/// マクスウェル方程式の損失 (ガウスの法則とアンペールの法則)
pub fn maxwell_equations_loss(
    electric_field: f64,
    magnetic_field: f64,
    charge_density: f64,
    current_density: f64,
) -> f64 {
    let gauss_residual = electric_field - charge_density / EPSILON_0;
    let ampere_residual = MU_0 * current_density - magnetic_field;

    gauss_residual.powi(2) + ampere_residual.powi(2)
}

/// 熱方程式の損失 (単位: (K/s)^2)
pub fn heat_equation_loss(u: f64, u_target: f64, dx: f64, dt: f64) -> f64 {
    let thermal_diffusivity = K_B / (ETA * ELECTRON_MASS);

    let time_derivative = (u - u_target) / dt;
    let second_spatial_derivative = (u - 2.0 * u_target + (u - u_target)) / (dx * dx);

    self_normalize((thermal_diffusivity * second_spatial_derivative - time_derivative).powi(2))
}

/// 波動方程式の損失 (単位: (m^2/s^2)^2)
///
/// `time`は使用しません。
pub fn wave_equation_loss(u: f64, u_target: f64, _time: f64, dx: f64, dt: f64) -> f64 {
    let spatial_term = (u - u_target) / (dx * dx);
    let temporal_term = (u - u_target) / (dt * dt);

    self_normalize(((1.0 / (WAVE_SPEED * WAVE_SPEED)) * spatial_term - temporal_term).powi(2))
}

/// ナビエ–ストークス方程式 (非圧縮流れのx成分) の損失 (単位: (m/s)^2)
pub fn navier_stokes_loss(u: f64, v: f64, pressure: f64, viscosity: f64, time_step: f64) -> f64 {
    let du_dt = (u - v) / time_step;
    let du_dx = u / time_step;
    let d2u_dx2 = (u - 2.0 * v + u) / (time_step * time_step);

    let residual =
        du_dt + u * du_dx + (1.0 / RHO) * (pressure / time_step) - viscosity * d2u_dx2 - G;

    residual.powi(2) / (residual.abs() + EPSILON)
}

/// 境界条件の損失
pub fn boundary_condition_loss(value: f64, boundary_value: f64) -> f64 {
    (value - boundary_value).powi(2) / NORMALIZATION_FACTOR
}

/// 初期条件の損失
pub fn initial_condition_loss(value: f64, initial_value: f64) -> f64 {
    (value - initial_value).powi(2) / NORMALIZATION_FACTOR
}

/// 質量保存則の損失
pub fn conservation_of_mass_loss(divergence_velocity: f64, mass_source: f64) -> f64 {
    (divergence_velocity - mass_source).powi(2) / NORMALIZATION_FACTOR
}

/// 損失関数に渡す物理パラメータ。学習中は変更されません。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LossParameters {
    pub potential: f64,
    pub charge_density: f64,
    pub current_density: f64,
    pub thermal_conductivity: f64,
    pub wave_speed: f64,
    pub viscosity: f64,
}

/// 学習で使用する偏微分方程式の種類。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossKind {
    Schrodinger,
    Maxwell,
    Heat,
    Wave,
    NavierStokes,
}

impl LossKind {
    pub const ALL: [LossKind; 5] = [
        LossKind::Schrodinger,
        LossKind::Maxwell,
        LossKind::Heat,
        LossKind::Wave,
        LossKind::NavierStokes,
    ];

    /// コマンドラインやログファイル名で使う名前。
    pub fn as_str(&self) -> &'static str {
        match self {
            LossKind::Schrodinger => "schrodinger",
            LossKind::Maxwell => "maxwell",
            LossKind::Heat => "heat",
            LossKind::Wave => "wave",
            LossKind::NavierStokes => "navier_stokes",
        }
    }

    /// グラフのタイトルに使う表示名。
    pub fn title(&self) -> &'static str {
        match self {
            LossKind::Schrodinger => "Schrödinger",
            LossKind::Maxwell => "Maxwell",
            LossKind::Heat => "Heat",
            LossKind::Wave => "Wave",
            LossKind::NavierStokes => "Navier-Stokes",
        }
    }

    /// ネットワークの出力と目標値から、この方程式の損失を計算します。
    ///
    /// ナビエ–ストークス以外は`output[0]`のみを使います。
    pub fn evaluate(&self, output: &[f64], target: f64, params: &LossParameters) -> f64 {
        match self {
            LossKind::Schrodinger => {
                schrodinger_equation_loss(output[0], target, params.potential, TIME_STEP)
            }
            LossKind::Maxwell => maxwell_equations_loss(
                output[0],
                0.0,
                params.charge_density,
                params.current_density,
            ),
            LossKind::Heat => heat_equation_loss(output[0], target, SPACE_STEP, TIME_STEP),
            LossKind::Wave => wave_equation_loss(output[0], target, 0.0, SPACE_STEP, TIME_STEP),
            LossKind::NavierStokes => {
                navier_stokes_loss(output[0], output[1], output[2], params.viscosity, TIME_STEP)
            }
        }
    }

    /// 損失の計算に必要なネットワーク出力の数。
    pub fn required_outputs(&self) -> usize {
        match self {
            LossKind::NavierStokes => 3,
            _ => 1,
        }
    }
}

impl FromStr for LossKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LossKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnsupportedLoss(s.to_string()))
    }
}

impl fmt::Display for LossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
