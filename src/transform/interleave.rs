// Phase 3: 2文書の交互結合
//
// Positions are 1-based and absolute within each source stream. Walking
// starts at `start_from`; pages before it are not emitted. Parity rules look
// at the absolute position, so A-odd+B-even over two scans of a duplex job
// yields A1, B2, A3, B4, ...

use serde::Deserialize;

use crate::error::PdfMixError;
use crate::pdf::page::PageStream;

/// 交互結合のモード。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterleaveMode {
    /// A1, B1, A2, B2, ... 長い方の残りは末尾に続ける。
    #[serde(alias = "alternating")]
    Alternate,
    /// 奇数位置はA、偶数位置はBから取る。
    AOddBEven,
    /// 偶数位置はA、奇数位置はBから取る。
    AEvenBOdd,
    /// Aの奇数位置のみ。
    AOdd,
    /// Bの偶数位置のみ。
    BEven,
}

impl InterleaveMode {
    /// このモードが読む入力の数。
    pub fn required_inputs(self) -> usize {
        match self {
            InterleaveMode::AOdd => 1,
            _ => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterleaveSpec {
    mode: InterleaveMode,
    start_from: u32,
}

impl InterleaveSpec {
    /// `start_from` は1-basedの開始位置。0はエラー。
    pub fn new(mode: InterleaveMode, start_from: u32) -> crate::error::Result<Self> {
        if start_from == 0 {
            return Err(PdfMixError::validation(
                "interleave start position is 1-based and must be at least 1",
            ));
        }
        Ok(Self { mode, start_from })
    }

    pub fn mode(&self) -> InterleaveMode {
        self.mode
    }

    pub fn start_from(&self) -> u32 {
        self.start_from
    }
}

impl Default for InterleaveSpec {
    fn default() -> Self {
        Self {
            mode: InterleaveMode::Alternate,
            start_from: 1,
        }
    }
}

fn is_odd(position: usize) -> bool {
    position % 2 == 1
}

/// 2つのPageStreamをモードに従って1本にまとめる。
pub fn interleave(a: &PageStream, b: &PageStream, spec: &InterleaveSpec) -> PageStream {
    let (pa, pb) = (a.len(), b.len());
    let start = spec.start_from as usize;
    let pages_a = a.pages();
    let pages_b = b.pages();
    let mut out = Vec::with_capacity(pa + pb);

    match spec.mode {
        InterleaveMode::Alternate => {
            let (mut ia, mut ib) = (start - 1, start - 1);
            while ia < pa || ib < pb {
                if ia < pa {
                    out.push(pages_a[ia].clone());
                    ia += 1;
                }
                if ib < pb {
                    out.push(pages_b[ib].clone());
                    ib += 1;
                }
            }
        }
        InterleaveMode::AOddBEven | InterleaveMode::AEvenBOdd => {
            let a_takes_odd = spec.mode == InterleaveMode::AOddBEven;
            for i in start..=pa.max(pb) {
                if i <= pa && is_odd(i) == a_takes_odd {
                    out.push(pages_a[i - 1].clone());
                }
                if i <= pb && is_odd(i) != a_takes_odd {
                    out.push(pages_b[i - 1].clone());
                }
            }
        }
        InterleaveMode::AOdd => {
            out.extend(
                (start..=pa)
                    .filter(|&i| is_odd(i))
                    .map(|i| pages_a[i - 1].clone()),
            );
        }
        InterleaveMode::BEven => {
            out.extend(
                (start..=pb)
                    .filter(|&i| !is_odd(i))
                    .map(|i| pages_b[i - 1].clone()),
            );
        }
    }

    PageStream::new(out)
}

/// 入力リストから交互結合を行う。モードが必要とする数の入力が無ければエラー。
pub fn interleave_streams(
    streams: &[PageStream],
    spec: &InterleaveSpec,
) -> crate::error::Result<PageStream> {
    let required = spec.mode.required_inputs();
    if streams.is_empty() || streams.len() < required || streams.len() > 2 {
        return Err(PdfMixError::validation(format!(
            "interleave mode {:?} needs {} input(s) (at most 2), got {}",
            spec.mode,
            required,
            streams.len()
        )));
    }

    let empty = PageStream::default();
    let b = streams.get(1).unwrap_or(&empty);
    Ok(interleave(&streams[0], b, spec))
}
