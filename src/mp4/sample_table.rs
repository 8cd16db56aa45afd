//! Sample table lookups.
//!
//! The raw tables are kept as parsed (run-length encoded where the wire
//! format run-length encodes) and expanded per query:
//! - stts: sample durations (decoding time)
//! - stss: sync sample table (keyframes)
//! - stsc: sample-to-chunk mapping
//! - stsz: sample sizes
//! - stco/co64: chunk offsets
//! - ctts: composition time offsets (for B-frames)
//!
//! All sample numbers are 1-indexed, as in the container format.

use crate::error::{Error, Result};

/// A half-open 1-indexed sample range `[first, last)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRange {
    /// First sample in the range.
    pub first: u32,
    /// One past the last sample in the range.
    pub last: u32,
}

impl SampleRange {
    /// Whether the range holds no samples.
    pub fn is_empty(&self) -> bool {
        self.first >= self.last
    }

    /// Number of samples in the range.
    pub fn len(&self) -> u32 {
        self.last.saturating_sub(self.first)
    }
}

/// Sample size information from stsz.
#[derive(Debug, Clone, Default)]
struct SampleSizes {
    /// Uniform size; 0 means per-sample sizes are listed.
    uniform_size: u32,
    /// Declared sample count.
    sample_count: u32,
    /// Per-sample sizes when uniform_size is 0.
    sizes: Vec<u32>,
}

/// Decoded sample tables for one track.
#[derive(Debug, Clone, Default)]
pub struct SampleTable {
    /// stts entries as (sample_count, sample_delta).
    stts: Option<Vec<(u32, u32)>>,
    /// stss sync sample numbers; None when the box is absent, in which case
    /// every sample is a sync sample.
    stss: Option<Vec<u32>>,
    /// stsc entries as (first_chunk, samples_per_chunk, sample_description_index).
    stsc: Option<Vec<(u32, u32, u32)>>,
    /// stsz.
    stsz: Option<SampleSizes>,
    /// stco/co64 chunk offsets, widened to u64.
    chunk_offsets: Option<Vec<u64>>,
    /// ctts entries as (sample_count, composition offset); None when absent.
    ctts: Option<Vec<(u32, i32)>>,
}

impl SampleTable {
    /// Create a new sample table builder.
    pub fn builder() -> SampleTableBuilder {
        SampleTableBuilder::new()
    }

    /// Total sample count declared by stsz.
    pub fn sample_count(&self) -> u32 {
        self.stsz.as_ref().map(|s| s.sample_count).unwrap_or(0)
    }

    /// Compute the sample range whose decode times fall in
    /// `[start_ticks, end_ticks)`.
    ///
    /// The first sample always belongs to the window starting at 0. A window
    /// that closes before any sample's cumulative time reaches its start
    /// yields an empty range. If the walk exhausts the table before reaching
    /// `end_ticks`, the range extends to the final sample.
    pub fn sample_range(&self, start_ticks: u64, end_ticks: u64) -> Result<SampleRange> {
        let stts = self.stts.as_ref().ok_or(Error::MissingBox("stts"))?;

        let mut first: Option<u32> = if start_ticks == 0 { Some(1) } else { None };
        let mut sample_num = 1u32;
        let mut cur_time = 0u64;

        for &(count, delta) in stts {
            for _ in 0..count {
                if first.is_none() && cur_time >= start_ticks {
                    first = Some(sample_num);
                }
                cur_time += delta as u64;
                if cur_time >= end_ticks {
                    let last = sample_num + 1;
                    // first still unset here means the window lies entirely
                    // past the timeline end: report an empty range.
                    return Ok(SampleRange {
                        first: first.unwrap_or(last),
                        last,
                    });
                }
                sample_num += 1;
            }
        }

        Ok(SampleRange {
            first: first.unwrap_or(1),
            last: sample_num,
        })
    }

    /// Size in bytes of sample `n` (1-indexed).
    pub fn size(&self, n: u32) -> Result<u32> {
        let stsz = self.stsz.as_ref().ok_or(Error::MissingBox("stsz"))?;
        if n == 0 || n > stsz.sample_count {
            return Err(Error::SampleOutOfRange {
                sample: n,
                count: stsz.sample_count,
            });
        }
        if stsz.uniform_size > 0 {
            Ok(stsz.uniform_size)
        } else {
            stsz.sizes
                .get((n - 1) as usize)
                .copied()
                .ok_or(Error::SampleOutOfRange {
                    sample: n,
                    count: stsz.sizes.len() as u32,
                })
        }
    }

    /// Decode duration of sample `n` in timescale ticks, or None when the
    /// stts table does not cover it.
    pub fn duration(&self, n: u32) -> Option<u32> {
        let stts = self.stts.as_ref()?;
        let mut covered = 0u64;
        for &(count, delta) in stts {
            covered += count as u64;
            if (n as u64) <= covered {
                return Some(delta);
            }
        }
        None
    }

    /// Whether sample `n` is a sync sample (keyframe).
    ///
    /// An absent stss marks every sample sync; a present stss marks exactly
    /// its members, even when it is empty.
    pub fn is_sync(&self, n: u32) -> bool {
        match &self.stss {
            None => true,
            Some(sync) => sync.binary_search(&n).is_ok(),
        }
    }

    /// Composition time offset of sample `n`; 0 when ctts is absent or does
    /// not cover the sample.
    pub fn composition_offset(&self, n: u32) -> i32 {
        let Some(ctts) = &self.ctts else {
            return 0;
        };
        let mut covered = 0u64;
        for &(count, offset) in ctts {
            covered += count as u64;
            if (n as u64) <= covered {
                return offset;
            }
        }
        0
    }

    /// Absolute file offset of sample `n`'s data.
    pub fn file_offset(&self, n: u32) -> Result<u64> {
        let (chunk, first_in_chunk) = self.chunk_for_sample(n)?;
        let offsets = self
            .chunk_offsets
            .as_ref()
            .ok_or(Error::MissingBox("stco"))?;
        let chunk_offset = offsets
            .get((chunk - 1) as usize)
            .copied()
            .ok_or(Error::ChunkOffsetMissing { chunk })?;

        let mut within = 0u64;
        for k in first_in_chunk..n {
            within += self.size(k)? as u64;
        }
        Ok(chunk_offset + within)
    }

    /// Resolve the chunk containing sample `n`.
    ///
    /// Returns the 1-based chunk number and the first sample number stored
    /// in that chunk.
    fn chunk_for_sample(&self, n: u32) -> Result<(u32, u32)> {
        let stsc = self.stsc.as_ref().ok_or(Error::MissingBox("stsc"))?;

        let resolve = |rel: u64, run_start: u64, first_chunk: u32, per_chunk: u32| {
            let chunk_idx = rel / per_chunk as u64;
            let chunk = first_chunk as u64 + chunk_idx;
            let first_in_chunk = run_start + chunk_idx * per_chunk as u64;
            (chunk as u32, first_in_chunk as u32)
        };

        let mut run_start_sample = 1u64;
        for (i, &(first_chunk, per_chunk, _)) in stsc.iter().enumerate() {
            if per_chunk == 0 {
                continue;
            }
            match stsc.get(i + 1).map(|e| e.0) {
                Some(next) => {
                    let run_chunks = next.saturating_sub(first_chunk) as u64;
                    let run_samples = run_chunks * per_chunk as u64;
                    if (n as u64) < run_start_sample + run_samples {
                        let rel = n as u64 - run_start_sample;
                        return Ok(resolve(rel, run_start_sample, first_chunk, per_chunk));
                    }
                    run_start_sample += run_samples;
                }
                None => {
                    // Final run covers all remaining chunks.
                    if (n as u64) >= run_start_sample {
                        let rel = n as u64 - run_start_sample;
                        return Ok(resolve(rel, run_start_sample, first_chunk, per_chunk));
                    }
                }
            }
        }

        Err(Error::SampleOutOfRange {
            sample: n,
            count: self.sample_count(),
        })
    }
}

/// Builder for constructing a sample table from raw atom data.
#[derive(Debug, Default)]
pub struct SampleTableBuilder {
    stts: Option<Vec<(u32, u32)>>,
    stss: Option<Vec<u32>>,
    stsc: Option<Vec<(u32, u32, u32)>>,
    stsz: Option<SampleSizes>,
    chunk_offsets: Option<Vec<u64>>,
    ctts: Option<Vec<(u32, i32)>>,
}

impl SampleTableBuilder {
    /// Create a new builder with every table absent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set stts (decoding time to sample) entries.
    pub fn set_stts(&mut self, entries: Vec<(u32, u32)>) {
        self.stts = Some(entries);
    }

    /// Set stss (sync sample) entries.
    pub fn set_stss(&mut self, samples: Vec<u32>) {
        self.stss = Some(samples);
    }

    /// Set stsc (sample to chunk) entries.
    pub fn set_stsc(&mut self, entries: Vec<(u32, u32, u32)>) {
        self.stsc = Some(entries);
    }

    /// Set stsz (sample size) data.
    pub fn set_stsz(&mut self, uniform_size: u32, sample_count: u32, sizes: Vec<u32>) {
        self.stsz = Some(SampleSizes {
            uniform_size,
            sample_count,
            sizes,
        });
    }

    /// Set chunk offsets (from stco or co64).
    pub fn set_chunk_offsets(&mut self, offsets: Vec<u64>) {
        self.chunk_offsets = Some(offsets);
    }

    /// Set ctts (composition time to sample) entries.
    pub fn set_ctts(&mut self, entries: Vec<(u32, i32)>) {
        self.ctts = Some(entries);
    }

    /// Build the sample table.
    pub fn build(self) -> SampleTable {
        SampleTable {
            stts: self.stts,
            stss: self.stss,
            stsc: self.stsc,
            stsz: self.stsz,
            chunk_offsets: self.chunk_offsets,
            ctts: self.ctts,
        }
    }
}
