//! fast5 access on top of HDF5.
//!
//! Two layouts exist in the wild:
//!   * single-read: `/UniqueGlobalKey/channel_id`, `/Raw/Reads/Read_<n>/Signal`,
//!     `/Analyses/...` at the file root;
//!   * multi-read: one `/read_<id>` group per read holding `Raw/Signal`,
//!     `channel_id` and `Analyses`.
//!
//! Both are exposed through [`Fast5Read`], so callers never care which one they got.

use hdf5::types::{FixedAscii, FixedUnicode, TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{Container, Group, Location};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::model::{self, ChannelInfo};

// Fixed-length strings are read into the smallest bucket that fits.
const SHORT_STR: usize = 256;
const LONG_STR: usize = 1 << 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    /// Read/write, the file must already exist.
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Layout {
    Single,
    Multi,
}

/// Raw signal either as ADC levels or calibrated to pA.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Discrete(Vec<i16>),
    Continuous(Vec<f32>),
}

impl Signal {
    pub fn len(&self) -> usize {
        match self {
            Signal::Discrete(v) => v.len(),
            Signal::Continuous(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            Signal::Discrete(v) => v.iter().map(|&x| x as f64).collect(),
            Signal::Continuous(v) => v.iter().map(|&x| x as f64).collect(),
        }
    }
}

pub struct Fast5File {
    path: PathBuf,
    file: hdf5::File,
    layout: Layout,
}

impl Fast5File {
    pub fn open(path: &Path, mode: OpenMode) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let file = match mode {
            OpenMode::Read => hdf5::File::open(path)?,
            OpenMode::Append => hdf5::File::open_rw(path)?,
        };
        let layout =
            detect_layout(&file)?.ok_or_else(|| Error::UnknownLayout(path.to_path_buf()))?;
        log::debug!("opened {} ({:?})", path.display(), layout);
        Ok(Self {
            path: path.to_path_buf(),
            file,
            layout,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Every read stored in the file. A single-read file yields itself.
    pub fn reads(&self) -> Result<Vec<Fast5Read>> {
        match self.layout {
            Layout::Single => {
                let root: Group = (*self.file).clone();
                let reads_grp = open_group(&root, "Raw/Reads")?.ok_or_else(|| Error::Missing {
                    read: self.path.display().to_string(),
                    what: "Raw/Reads".into(),
                })?;
                let raw_name = reads_grp
                    .member_names()?
                    .into_iter()
                    .find(|n| n.starts_with("Read_"))
                    .ok_or_else(|| Error::Missing {
                        read: self.path.display().to_string(),
                        what: "Raw/Reads/Read_*".into(),
                    })?;
                let raw = reads_grp.group(&raw_name)?;
                let channel = open_group(&root, "UniqueGlobalKey/channel_id")?.ok_or_else(|| {
                    Error::Missing {
                        read: self.path.display().to_string(),
                        what: "UniqueGlobalKey/channel_id".into(),
                    }
                })?;
                let id = attr_string(&raw, "read_id")?.unwrap_or(raw_name);
                Ok(vec![Fast5Read {
                    id,
                    root,
                    raw,
                    channel,
                }])
            }
            Layout::Multi => {
                let mut out = Vec::new();
                for name in self.file.member_names()? {
                    let Some(fallback) = name.strip_prefix("read_") else {
                        continue;
                    };
                    let root = self.file.group(&name)?;
                    let raw = open_group(&root, "Raw")?.ok_or_else(|| Error::Missing {
                        read: name.clone(),
                        what: "Raw".into(),
                    })?;
                    let channel =
                        open_group(&root, "channel_id")?.ok_or_else(|| Error::Missing {
                            read: name.clone(),
                            what: "channel_id".into(),
                        })?;
                    let id = attr_string(&raw, "read_id")?.unwrap_or_else(|| fallback.to_string());
                    out.push(Fast5Read {
                        id,
                        root,
                        raw,
                        channel,
                    });
                }
                Ok(out)
            }
        }
    }

    pub fn read_ids(&self) -> Result<Vec<String>> {
        Ok(self.reads()?.into_iter().map(|r| r.id).collect())
    }
}

fn detect_layout(root: &Group) -> Result<Option<Layout>> {
    if root.link_exists("UniqueGlobalKey") {
        return Ok(Some(Layout::Single));
    }
    if root.member_names()?.iter().any(|n| n.starts_with("read_")) {
        return Ok(Some(Layout::Multi));
    }
    Ok(None)
}

/// One read, whichever layout it came from.
pub struct Fast5Read {
    id: String,
    root: Group,
    raw: Group,
    channel: Group,
}

impl Fast5Read {
    pub fn read_id(&self) -> &str {
        &self.id
    }

    pub fn raw_signal(&self) -> Result<Vec<i16>> {
        let ds = self.raw.dataset("Signal").map_err(|_| self.missing("Raw/Signal"))?;
        Ok(ds.read_raw::<i16>()?)
    }

    /// Signal in pA: `(raw + offset) * range / digitisation`.
    pub fn scaled_signal(&self) -> Result<Vec<f32>> {
        let (offset, scale) = self.offset_scale()?;
        Ok(self
            .raw_signal()?
            .into_iter()
            .map(|x| ((x as f64 + offset) * scale) as f32)
            .collect())
    }

    pub fn signal(&self, continuous: bool) -> Result<Signal> {
        if continuous {
            self.scaled_signal().map(Signal::Continuous)
        } else {
            self.raw_signal().map(Signal::Discrete)
        }
    }

    pub fn n_samples(&self) -> Result<usize> {
        let ds = self.raw.dataset("Signal").map_err(|_| self.missing("Raw/Signal"))?;
        Ok(ds.size())
    }

    pub fn channel_info(&self) -> Result<ChannelInfo> {
        Ok(ChannelInfo {
            channel_number: attr_string(&self.channel, "channel_number")?.unwrap_or_default(),
            digitisation: self.required_f64(&self.channel, "digitisation")?,
            offset: self.required_f64(&self.channel, "offset")?,
            range: self.required_f64(&self.channel, "range")?,
            sampling_rate: attr_f64(&self.channel, "sampling_rate")?.unwrap_or(f64::NAN),
        })
    }

    /// `(offset, scale)` such that pA = (level + offset) * scale.
    pub fn offset_scale(&self) -> Result<(f64, f64)> {
        Ok(crate::signal::offset_scale(&self.channel_info()?))
    }

    /// Name of the newest `Analyses/<name>_NNN` group, if any.
    pub fn latest_analysis(&self, name: &str) -> Result<Option<String>> {
        let Some(analyses) = open_group(&self.root, "Analyses")? else {
            return Ok(None);
        };
        Ok(latest_group(&analyses.member_names()?, name))
    }

    /// Group `Analyses/<analysis>/<sub>`.
    pub fn analysis_group(&self, analysis: &str, sub: &str) -> Result<Option<Group>> {
        open_group(&self.root, &format!("Analyses/{analysis}/{sub}"))
    }

    /// Dataset `Analyses/<analysis>/<path>`.
    pub fn analysis_dataset(&self, analysis: &str, path: &str) -> Result<Option<hdf5::Dataset>> {
        let full = format!("Analyses/{analysis}/{path}");
        let (parent, leaf) = match full.rsplit_once('/') {
            Some(x) => x,
            None => return Ok(None),
        };
        let Some(grp) = open_group(&self.root, parent)? else {
            return Ok(None);
        };
        if !grp.link_exists(leaf) {
            return Ok(None);
        }
        Ok(Some(grp.dataset(leaf)?))
    }

    /// Attribute of `Analyses/<analysis>/Summary/<section>`.
    pub fn summary_u64(&self, analysis: &str, section: &str, attr: &str) -> Result<Option<u64>> {
        match self.analysis_group(analysis, &format!("Summary/{section}"))? {
            Some(g) => attr_u64(&g, attr),
            None => Ok(None),
        }
    }

    /// FASTQ text of the latest basecall.
    pub fn fastq(&self) -> Result<Option<String>> {
        let Some(bc) = self.latest_analysis(model::BASECALL_1D)? else {
            return Ok(None);
        };
        match self.analysis_dataset(&bc, "BaseCalled_template/Fastq")? {
            Some(ds) => Ok(Some(read_string(&ds, "Fastq")?)),
            None => Ok(None),
        }
    }

    /// Raw samples per move-table block of the latest basecall.
    pub fn block_stride(&self) -> Result<Option<u64>> {
        let Some(bc) = self.latest_analysis(model::BASECALL_1D)? else {
            return Ok(None);
        };
        let stride = self.summary_u64(&bc, "basecall_1d_template", "block_stride")?;
        stride.map(Some).ok_or_else(|| self.missing("block_stride"))
    }

    /// Raw index of the first basecalled sample (`first_sample_template`).
    pub fn raw_start_index(&self) -> Result<Option<u64>> {
        let Some(seg) = self.latest_analysis(model::SEGMENTATION)? else {
            return Ok(None);
        };
        let start = self.summary_u64(&seg, "segmentation", "first_sample_template")?;
        start.map(Some).ok_or_else(|| self.missing("first_sample_template"))
    }

    /// Move table of the latest basecall, `None` if it was not written.
    pub fn move_table(&self) -> Result<Option<Vec<u8>>> {
        let Some(bc) = self.latest_analysis(model::BASECALL_1D)? else {
            return Ok(None);
        };
        match self.analysis_dataset(&bc, "BaseCalled_template/Move")? {
            Some(ds) => Ok(Some(ds.read_raw::<u8>()?)),
            None => Ok(None),
        }
    }

    fn required_f64(&self, loc: &Location, name: &str) -> Result<f64> {
        attr_f64(loc, name)?.ok_or_else(|| self.missing(name))
    }

    pub(crate) fn missing(&self, what: &str) -> Error {
        Error::Missing {
            read: self.id.clone(),
            what: what.to_string(),
        }
    }
}

/// Pick `<prefix>_NNN` with the highest NNN.
pub(crate) fn latest_group(names: &[String], prefix: &str) -> Option<String> {
    names
        .iter()
        .filter_map(|n| {
            let idx = n.strip_prefix(prefix)?.strip_prefix('_')?;
            if idx.is_empty() || !idx.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            Some((idx.parse::<u64>().ok()?, n))
        })
        .max_by_key(|(i, _)| *i)
        .map(|(_, n)| n.clone())
}

/// Walks `path` one component at a time so missing intermediates are `None`.
pub(crate) fn open_group(root: &Group, path: &str) -> Result<Option<Group>> {
    let mut cur = root.clone();
    for part in path.split('/').filter(|p| !p.is_empty()) {
        if !cur.link_exists(part) {
            return Ok(None);
        }
        cur = cur.group(part)?;
    }
    Ok(Some(cur))
}

fn has_attr(loc: &Location, name: &str) -> Result<bool> {
    Ok(loc.attr_names()?.iter().any(|n| n == name))
}

pub(crate) fn attr_f64(loc: &Location, name: &str) -> Result<Option<f64>> {
    if !has_attr(loc, name)? {
        return Ok(None);
    }
    Ok(Some(loc.attr(name)?.read_scalar::<f64>()?))
}

pub(crate) fn attr_u64(loc: &Location, name: &str) -> Result<Option<u64>> {
    if !has_attr(loc, name)? {
        return Ok(None);
    }
    Ok(Some(loc.attr(name)?.read_scalar::<u64>()?))
}

pub(crate) fn attr_string(loc: &Location, name: &str) -> Result<Option<String>> {
    if !has_attr(loc, name)? {
        return Ok(None);
    }
    let attr = loc.attr(name)?;
    read_string(&attr, name).map(Some)
}

/// Reads a scalar string of any HDF5 string flavour.
pub(crate) fn read_string(c: &Container, what: &str) -> Result<String> {
    let s = match c.dtype()?.to_descriptor()? {
        TypeDescriptor::VarLenAscii => c.read_scalar::<VarLenAscii>()?.as_str().to_owned(),
        TypeDescriptor::VarLenUnicode => c.read_scalar::<VarLenUnicode>()?.as_str().to_owned(),
        TypeDescriptor::FixedAscii(n) if n <= SHORT_STR => c
            .read_scalar::<FixedAscii<SHORT_STR>>()?
            .as_str()
            .to_owned(),
        TypeDescriptor::FixedUnicode(n) if n <= SHORT_STR => c
            .read_scalar::<FixedUnicode<SHORT_STR>>()?
            .as_str()
            .to_owned(),
        // large fixed strings stay on the heap
        TypeDescriptor::FixedAscii(_) => c
            .read_raw::<FixedAscii<LONG_STR>>()?
            .first()
            .map(|s| s.as_str().to_owned())
            .unwrap_or_default(),
        TypeDescriptor::FixedUnicode(_) => c
            .read_raw::<FixedUnicode<LONG_STR>>()?
            .first()
            .map(|s| s.as_str().to_owned())
            .unwrap_or_default(),
        _ => return Err(Error::NotAString(what.to_string())),
    };
    Ok(s)
}

/// Builders for small synthetic fast5 files used across the test suite.
#[cfg(test)]
pub(crate) mod fixtures {
    use hdf5::types::{FixedAscii, VarLenUnicode};
    use hdf5::{Group, Location};
    use std::path::Path;

    pub struct ReadFixture<'a> {
        pub id: &'a str,
        pub signal: Vec<i16>,
        pub fastq: Option<&'a str>,
        pub moves: Option<Vec<u8>>,
        pub block_stride: u64,
        pub first_sample: u64,
    }

    impl<'a> ReadFixture<'a> {
        pub fn new(id: &'a str, signal: Vec<i16>) -> Self {
            Self {
                id,
                signal,
                fastq: None,
                moves: None,
                block_stride: 5,
                first_sample: 0,
            }
        }
    }

    pub fn str_attr(loc: &Location, name: &str, value: &str) {
        let v: VarLenUnicode = value.parse().unwrap();
        loc.new_attr::<VarLenUnicode>()
            .shape(())
            .create(name)
            .unwrap()
            .write_scalar(&v)
            .unwrap();
    }

    pub fn f64_attr(loc: &Location, name: &str, value: f64) {
        loc.new_attr::<f64>()
            .shape(())
            .create(name)
            .unwrap()
            .write_scalar(&value)
            .unwrap();
    }

    pub fn i64_attr(loc: &Location, name: &str, value: i64) {
        loc.new_attr::<i64>()
            .shape(())
            .create(name)
            .unwrap()
            .write_scalar(&value)
            .unwrap();
    }

    pub fn channel(g: &Group) {
        str_attr(g, "channel_number", "42");
        f64_attr(g, "digitisation", 8192.0);
        f64_attr(g, "offset", 10.0);
        f64_attr(g, "range", 1400.0);
        f64_attr(g, "sampling_rate", 4000.0);
    }

    pub fn analyses(root: &Group, r: &ReadFixture) {
        let analyses = root.create_group("Analyses").unwrap();
        // an older basecall that must be ignored
        analyses.create_group("Basecall_1D_000").unwrap();
        let bc = analyses.create_group("Basecall_1D_001").unwrap();
        let tmpl = bc.create_group("BaseCalled_template").unwrap();
        if let Some(fq) = r.fastq {
            let v: VarLenUnicode = fq.parse().unwrap();
            tmpl.new_dataset::<VarLenUnicode>()
                .shape(())
                .create("Fastq")
                .unwrap()
                .write_scalar(&v)
                .unwrap();
        }
        if let Some(moves) = &r.moves {
            tmpl.new_dataset_builder()
                .with_data(moves.as_slice())
                .create("Move")
                .unwrap();
        }
        let summary = bc.create_group("Summary").unwrap();
        let bct = summary.create_group("basecall_1d_template").unwrap();
        i64_attr(&bct, "block_stride", r.block_stride as i64);

        let seg = analyses.create_group("Segmentation_001").unwrap();
        let seg_summary = seg.create_group("Summary").unwrap();
        let s = seg_summary.create_group("segmentation").unwrap();
        i64_attr(&s, "first_sample_template", r.first_sample as i64);
    }

    pub fn write_multi(path: &Path, reads: &[ReadFixture]) {
        let f = hdf5::File::create(path).unwrap();
        str_attr(&f, "file_type", "multi-read");
        for r in reads {
            let root = f.create_group(&format!("read_{}", r.id)).unwrap();
            let raw = root.create_group("Raw").unwrap();
            let id = FixedAscii::<64>::from_ascii(r.id.as_bytes()).unwrap();
            raw.new_attr::<FixedAscii<64>>()
                .shape(())
                .create("read_id")
                .unwrap()
                .write_scalar(&id)
                .unwrap();
            raw.new_dataset_builder()
                .with_data(r.signal.as_slice())
                .create("Signal")
                .unwrap();
            let ch = root.create_group("channel_id").unwrap();
            channel(&ch);
            analyses(&root, r);
        }
    }

    pub fn write_single(path: &Path, r: &ReadFixture) {
        let f = hdf5::File::create(path).unwrap();
        let ugk = f.create_group("UniqueGlobalKey").unwrap();
        let ch = ugk.create_group("channel_id").unwrap();
        channel(&ch);
        let raw = f.create_group("Raw").unwrap();
        let reads = raw.create_group("Reads").unwrap();
        let rd = reads.create_group("Read_17").unwrap();
        str_attr(&rd, "read_id", r.id);
        rd.new_dataset_builder()
            .with_data(r.signal.as_slice())
            .create("Signal")
            .unwrap();
        analyses(&f, r);
    }
}
