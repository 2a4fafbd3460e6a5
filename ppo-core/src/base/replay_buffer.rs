//! Buffer interfaces.
//!
//! Storage ([`ExperienceBufferBase`]) and batch generation
//! ([`ReplayBufferBase`]) are separate traits so that a learner can depend
//! only on the part it consumes.
use anyhow::Result;

/// Interface for buffers that store experiences.
///
/// # Examples
///
/// ```ignore
/// struct SimpleBuffer<T> {
///     items: Vec<T>,
/// }
///
/// impl<T> ExperienceBufferBase for SimpleBuffer<T> {
///     type Item = T;
///
///     fn push(&mut self, tr: T) -> Result<()> {
///         self.items.push(tr);
///         Ok(())
///     }
///
///     fn len(&self) -> usize {
///         self.items.len()
///     }
/// }
/// ```
pub trait ExperienceBufferBase {
    /// The type of items stored in the buffer.
    type Item;

    /// Pushes an experience into the buffer.
    fn push(&mut self, tr: Self::Item) -> Result<()>;

    /// Returns the number of experiences in the buffer.
    fn len(&self) -> usize;

    /// Returns `true` if the buffer holds no experience.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Interface for buffers that generate batches for training.
pub trait ReplayBufferBase {
    /// Configuration of the buffer.
    type Config: Clone;

    /// The type of batch generated for training.
    type Batch;

    /// Builds a buffer from the given configuration.
    fn build(config: &Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// Samples a batch of at most `size` experiences.
    fn batch(&mut self, size: usize) -> Result<Self::Batch>;
}
