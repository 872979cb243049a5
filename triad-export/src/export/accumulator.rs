//! Ray-batch sampling loop and point accumulation.

use glam::Vec3;
use tracing::debug;

use crate::export::config::{ChannelNames, EMBEDDING_SCALES, EMBEDDING_WIDTH};
use crate::export::error::Result;
use crate::export::progress::ProgressReporter;
use crate::ingest::{OutputMap, RadianceField, RayBatch, RayBatchSource};

/// Samples gathered from one ray batch.
#[derive(Debug, Clone)]
struct BatchSamples {
    points: Vec<Vec3>,
    origins: Vec<Vec3>,
    directions: Vec<Vec3>,
    rgbs: Vec<Vec3>,
    clip: Vec<f32>,
    normals: Option<Vec<Vec3>>,
}

/// Everything sampled, concatenated in batch order.
///
/// All per-point sequences are index aligned: entry `i` of each belongs to
/// the same ray.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccumulatedSet {
    pub points: Vec<Vec3>,
    pub origins: Vec<Vec3>,
    pub directions: Vec<Vec3>,
    pub rgbs: Vec<Vec3>,
    /// Row-major `[N, EMBEDDING_SCALES, EMBEDDING_WIDTH]`.
    pub clip: Vec<f32>,
    pub normals: Option<Vec<Vec3>>,
}

impl AccumulatedSet {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Embedding rows of one scale, `[N, EMBEDDING_WIDTH]` as row slices.
    pub fn clip_scale_rows(&self, scale: usize) -> impl ExactSizeIterator<Item = &[f32]> + '_ {
        let stride = EMBEDDING_SCALES * EMBEDDING_WIDTH;
        let offset = scale * EMBEDDING_WIDTH;
        self.clip
            .chunks_exact(stride)
            .map(move |ray| &ray[offset..offset + EMBEDDING_WIDTH])
    }
}

/// Draws ray batches until a point budget is met.
///
/// Progress is counted in points rather than batches because batch sizes may
/// vary between steps.
#[derive(Debug)]
pub struct PointAccumulator {
    names: ChannelNames,
    target: usize,
    batches: Vec<BatchSamples>,
    count: usize,
    steps: usize,
}

impl PointAccumulator {
    pub fn new(names: ChannelNames, target: usize) -> Self {
        Self {
            names,
            target,
            batches: Vec::new(),
            count: 0,
            steps: 0,
        }
    }

    /// Points accumulated so far.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of batches drawn so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// True once the budget is reached.
    pub fn is_done(&self) -> bool {
        self.count >= self.target
    }

    /// Resolve one batch's outputs and stage its samples.
    ///
    /// Returns the number of points added.
    pub fn push_batch(&mut self, batch: RayBatch, outputs: &OutputMap) -> Result<usize> {
        let resolved = outputs.resolve(&self.names, batch.len())?;
        let points = batch.points_at(&resolved.depth);
        let (origins, directions) = batch.into_parts();
        let added = points.len();

        self.batches.push(BatchSamples {
            points,
            origins,
            directions,
            rgbs: resolved.rgb,
            clip: resolved.clip,
            normals: resolved.normals,
        });
        self.count += added;
        self.steps += 1;
        Ok(added)
    }

    /// Sample until the budget is met.
    ///
    /// A source that keeps returning empty batches never finishes; callers
    /// are responsible for providing one that makes progress.
    pub fn run<S, M, P>(&mut self, source: &mut S, model: &M, progress: &mut P) -> Result<()>
    where
        S: RayBatchSource + ?Sized,
        M: RadianceField + ?Sized,
        P: ProgressReporter + ?Sized,
    {
        progress.start("Generating Point Cloud", self.target as u64);
        while !self.is_done() {
            let step = self.steps;
            let (batch, _metadata) = source.next_batch(step)?;
            let outputs = model.evaluate(&batch)?;
            let added = self.push_batch(batch, &outputs)?;
            debug!("Step {}: {} points (total {}/{})", step, added, self.count, self.target);
            progress.advance(added as u64);
        }
        progress.finish();
        Ok(())
    }

    /// Concatenate all staged batches in the order they were drawn.
    pub fn concatenate(self) -> AccumulatedSet {
        let with_normals = self.names.normal.is_some();
        let mut set = AccumulatedSet {
            points: Vec::with_capacity(self.count),
            origins: Vec::with_capacity(self.count),
            directions: Vec::with_capacity(self.count),
            rgbs: Vec::with_capacity(self.count),
            clip: Vec::with_capacity(self.count * EMBEDDING_SCALES * EMBEDDING_WIDTH),
            normals: with_normals.then(|| Vec::with_capacity(self.count)),
        };
        for batch in self.batches {
            set.points.extend(batch.points);
            set.origins.extend(batch.origins);
            set.directions.extend(batch.directions);
            set.rgbs.extend(batch.rgbs);
            set.clip.extend(batch.clip);
            if let (Some(all), Some(normals)) = (set.normals.as_mut(), batch.normals) {
                all.extend(normals);
            }
        }
        set
    }
}

/// Run a [`PointAccumulator`] to completion and return the concatenated set.
pub fn accumulate_points<S, M, P>(
    source: &mut S,
    model: &M,
    names: ChannelNames,
    target: usize,
    progress: &mut P,
) -> Result<AccumulatedSet>
where
    S: RayBatchSource + ?Sized,
    M: RadianceField + ?Sized,
    P: ProgressReporter + ?Sized,
{
    let mut accumulator = PointAccumulator::new(names, target);
    accumulator.run(source, model, progress)?;
    Ok(accumulator.concatenate())
}
