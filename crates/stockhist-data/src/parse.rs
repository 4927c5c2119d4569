//! 제공자 응답과 저장 파일이 함께 쓰는 필드 변환.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// 거래량 문자열을 정수로 바꿉니다.
///
/// `"1200.0"`처럼 소수부가 0인 표기도 허용합니다. 에러는 메시지만 돌려주고
/// 어떤 `DataError`로 감쌀지는 호출 측이 정합니다.
pub(crate) fn volume(raw: &str) -> Result<i64, String> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<i64>() {
        return Ok(v);
    }

    let dec = Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|e| format!("거래량 파싱 실패 '{}': {}", raw, e))?;
    if !dec.fract().is_zero() {
        return Err(format!("거래량이 정수가 아님: {}", raw));
    }
    dec.to_i64().ok_or_else(|| format!("거래량 범위 초과: {}", raw))
}
