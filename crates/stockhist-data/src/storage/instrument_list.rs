//! 시장별 종목 목록 로더.
//!
//! 시세 프로그램이 내보내는 UTF-16(BOM) + 탭 구분 목록 파일을 읽습니다.
//! UTF-8/쉼표 구분 파일도 허용합니다.
//!
//! 필수 컬럼: 코드(`代码` 또는 `code`), 이름(`名称` 또는 `name`).

use crate::error::{DataError, Result};
use std::collections::HashSet;
use std::path::Path;
use stockhist_core::{InstrumentRef, Market};
use tracing::{info, warn};

const CODE_HEADERS: [&str; 4] = ["代码", "code", "symbol", "ticker"];
const NAME_HEADERS: [&str; 2] = ["名称", "name"];

/// 종목 목록 파일을 읽어 `InstrumentRef` 목록으로 반환합니다.
///
/// 코드는 시장 자릿수에 맞춰 0으로 채워지며, 중복 종목은 첫 항목만 남깁니다.
pub fn load_instrument_list(path: &Path, market: Market) -> Result<Vec<InstrumentRef>> {
    if !path.exists() {
        return Err(DataError::NotFound(path.display().to_string()));
    }

    let bytes = std::fs::read(path)?;
    let text = decode_text(&bytes)?;
    let instruments = parse_instrument_list(&text, market)?;

    info!(
        path = %path.display(),
        market = market.label(),
        count = instruments.len(),
        "종목 목록 로드 완료"
    );
    Ok(instruments)
}

/// BOM으로 인코딩을 판별해 문자열로 변환합니다.
fn decode_text(bytes: &[u8]) -> Result<String> {
    match bytes {
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        [0xEF, 0xBB, 0xBF, rest @ ..] => utf8(rest),
        _ => utf8(bytes),
    }
}

fn utf8(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| DataError::InvalidList(format!("UTF-8 디코딩 실패: {}", e)))
}

fn decode_utf16(bytes: &[u8], to_u16: fn([u8; 2]) -> u16) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(DataError::InvalidList("UTF-16 바이트 수가 홀수".to_string()));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| to_u16([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units)
        .map_err(|e| DataError::InvalidList(format!("UTF-16 디코딩 실패: {}", e)))
}

fn find_column(headers: &csv::StringRecord, candidates: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.trim().trim_start_matches('\u{feff}');
        candidates.iter().any(|c| h.eq_ignore_ascii_case(c))
    })
}

fn parse_instrument_list(text: &str, market: Market) -> Result<Vec<InstrumentRef>> {
    let first_line = text.lines().next().unwrap_or_default();
    let delimiter = if first_line.contains('\t') { b'\t' } else { b',' };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let code_col = find_column(&headers, &CODE_HEADERS)
        .ok_or_else(|| DataError::InvalidList(format!("코드 컬럼 없음: {:?}", headers)))?;
    let name_col = find_column(&headers, &NAME_HEADERS)
        .ok_or_else(|| DataError::InvalidList(format!("이름 컬럼 없음: {:?}", headers)))?;

    let mut seen = HashSet::new();
    let mut instruments = Vec::new();

    for (idx, row) in reader.records().enumerate() {
        let row = row?;
        let line = idx + 2;

        let code = row.get(code_col).unwrap_or_default();
        if code.is_empty() {
            // 합계/빈 줄
            continue;
        }
        let name = row.get(name_col).unwrap_or_default();

        let instrument = InstrumentRef::new(code, name, market)
            .map_err(|e| DataError::InvalidList(format!("{}번째 행: {}", line, e)))?;

        if !seen.insert(instrument.key()) {
            warn!(code = %instrument.code, line, "중복 종목 무시");
            continue;
        }
        instruments.push(instrument);
    }

    Ok(instruments)
}
