//! FCPXML 時間值
//!
//! FCPXML 以有理數秒表示時間（例如 "3003/30000s"），
//! 使用整數運算保持精確，避免浮點累積誤差。

use anyhow::{Result, bail};
use std::fmt;
use std::ops::{Add, Sub};

/// 非負的有理數秒
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timecode {
    pub num: i64,
    pub den: i64,
}

impl Timecode {
    /// 建立時間值（分母必須為正）
    pub fn new(num: i64, den: i64) -> Result<Self> {
        if den <= 0 {
            bail!("時間分母必須為正: {num}/{den}");
        }
        if num < 0 {
            bail!("時間不可為負: {num}/{den}");
        }
        Ok(Self { num, den }.reduce())
    }

    pub const fn zero() -> Self {
        Self { num: 0, den: 1 }
    }

    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    /// 解析 FCPXML 時間屬性
    ///
    /// 支援三種形式："3003/30000s"、"5s"、"5.5s"
    pub fn parse(value: &str) -> Result<Self> {
        let Some(body) = value.strip_suffix('s') else {
            bail!("時間值缺少 s 後綴: {value}");
        };

        if let Some((num_str, den_str)) = body.split_once('/') {
            let num: i64 = num_str
                .parse()
                .map_err(|_| anyhow::anyhow!("無法解析時間分子: {value}"))?;
            let den: i64 = den_str
                .parse()
                .map_err(|_| anyhow::anyhow!("無法解析時間分母: {value}"))?;
            if den == 0 {
                bail!("時間分母為零: {value}");
            }
            return Self::new(num, den);
        }

        if let Some((int_str, frac_str)) = body.split_once('.') {
            if frac_str.is_empty() || !frac_str.bytes().all(|b| b.is_ascii_digit()) {
                bail!("無法解析時間值: {value}");
            }
            let int: i64 = int_str
                .parse()
                .map_err(|_| anyhow::anyhow!("無法解析時間值: {value}"))?;
            let frac: i64 = frac_str
                .parse()
                .map_err(|_| anyhow::anyhow!("無法解析時間值: {value}"))?;
            let den = 10_i64.pow(frac_str.len() as u32);
            if int < 0 {
                bail!("時間不可為負: {value}");
            }
            return Self::new(int * den + frac, den);
        }

        let num: i64 = body
            .parse()
            .map_err(|_| anyhow::anyhow!("無法解析時間值: {value}"))?;
        Self::new(num, 1)
    }

    /// 約分
    fn reduce(self) -> Self {
        if self.num == 0 {
            return Self { num: 0, den: 1 };
        }
        let g = gcd(self.num.unsigned_abs(), self.den.unsigned_abs()) as i64;
        Self {
            num: self.num / g,
            den: self.den / g,
        }
    }

    /// 精確相加
    pub fn add(self, other: Self) -> Self {
        let num = self.num * other.den + other.num * self.den;
        let den = self.den * other.den;
        Self { num, den }.reduce()
    }

    /// 精確相減，結果下限為零
    pub fn sub(self, other: Self) -> Self {
        let num = self.num * other.den - other.num * self.den;
        if num <= 0 {
            return Self::zero();
        }
        let den = self.den * other.den;
        Self { num, den }.reduce()
    }

    /// 轉為浮點秒（只在最終消費時使用）
    pub fn to_seconds(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl Default for Timecode {
    fn default() -> Self {
        Self::zero()
    }
}

impl PartialOrd for Timecode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timecode {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let lhs = self.num as i128 * other.den as i128;
        let rhs = other.num as i128 * self.den as i128;
        lhs.cmp(&rhs)
    }
}

impl Add for Timecode {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Timecode::add(self, rhs)
    }
}

impl Sub for Timecode {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Timecode::sub(self, rhs)
    }
}

impl fmt::Debug for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timecode({}/{}s)", self.num, self.den)
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.to_seconds())
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fraction() {
        let t = Timecode::parse("3003/30000s").unwrap();
        assert_eq!(t.num, 1001);
        assert_eq!(t.den, 10000);
        assert!((t.to_seconds() - 0.1001).abs() < 1e-9);
    }

    #[test]
    fn test_parse_integer() {
        let t = Timecode::parse("5s").unwrap();
        assert_eq!(t.num, 5);
        assert_eq!(t.den, 1);
    }

    #[test]
    fn test_parse_decimal() {
        let t = Timecode::parse("5.5s").unwrap();
        assert_eq!(t.num, 11);
        assert_eq!(t.den, 2);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Timecode::parse("5").is_err());
        assert!(Timecode::parse("1/0s").is_err());
        assert!(Timecode::parse("-3/30s").is_err());
        assert!(Timecode::parse("-1.5s").is_err());
        assert!(Timecode::parse("abcs").is_err());
        assert!(Timecode::parse("1.s").is_err());
        assert!(Timecode::parse("").is_err());
    }

    #[test]
    fn test_add_is_exact() {
        // 0.1001 秒（29.97fps 的三幀）累加一千次不可漂移
        let frame = Timecode::parse("1001/30000s").unwrap();
        let mut total = Timecode::zero();
        for _ in 0..1000 {
            total = total + frame;
        }
        assert_eq!(total, Timecode::new(1001000, 30000).unwrap());
    }

    #[test]
    fn test_sub_floors_at_zero() {
        let a = Timecode::parse("2s").unwrap();
        let b = Timecode::parse("5s").unwrap();
        assert!((a - b).is_zero());
    }

    #[test]
    fn test_ordering() {
        let a = Timecode::parse("1001/30000s").unwrap();
        let b = Timecode::parse("1/30s").unwrap();
        assert!(a > b);
    }

    #[test]
    fn test_display() {
        let t = Timecode::parse("3/2s").unwrap();
        assert_eq!(t.to_string(), "1.500s");
    }
}
