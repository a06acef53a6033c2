//! Implementation details

use core::convert::Infallible;
use core::mem;
use std::io;

use digest::{
    generic_array::{ArrayLength, GenericArray},
    typenum::{U16, U32},
    FixedOutput, FixedOutputReset, HashMarker, OutputSizeUser, Reset, Update,
};
use md4::Md4;

use crate::encoding::to_hex;
use crate::error::{infallible, Error};

/// Size of one ED2K chunk in bytes. Fixed by the protocol.
pub const CHUNK_SIZE: usize = 9728000;
/// Size of a chunk digest and of the root digest in bytes.
pub const DIGEST_SIZE: usize = 16;
/// MD4 of the empty byte sequence, the extra list entry of the red hash.
pub const MD4_EMPTY: [u8; DIGEST_SIZE] = [
    0x31, 0xd6, 0xcf, 0xe0, 0xd1, 0x6a, 0xe9, 0x31, 0xb7, 0x3c, 0x59, 0xd7, 0xe0, 0xc0, 0x89, 0xc0,
];

type Array<T> = GenericArray<u8, T>;

/// Digest of a single chunk, or of the whole file.
pub type ChunkDigest = Array<U16>;

/// A 128-bit streaming hash used for chunks and for the chunk list.
///
/// Every hash from the `digest` crate with a 16-byte output implements this
/// trait automatically and can never fail. Custom engines may fail to absorb;
/// a failed `absorb` must leave the engine state untouched.
pub trait BlockDigest: Default + Clone {
    /// Error returned when absorbing fails
    type Error: std::error::Error + Send + Sync + 'static;

    /// Feed bytes into the running hash.
    fn absorb(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Write the digest into `out` and return to the initial state.
    fn finish_reset(&mut self, out: &mut ChunkDigest);

    /// Return to the initial state, dropping absorbed bytes.
    fn restart(&mut self);

    /// Write the digest into `out` without touching `self`.
    fn finish(&self, out: &mut ChunkDigest) {
        self.clone().finish_reset(out);
    }
}

impl<T> BlockDigest for T
where
    T: Default + Clone + Update + FixedOutputReset + OutputSizeUser<OutputSize = U16>,
{
    type Error = Infallible;

    fn absorb(&mut self, data: &[u8]) -> Result<(), Infallible> {
        Update::update(self, data);
        Ok(())
    }

    fn finish_reset(&mut self, out: &mut ChunkDigest) {
        FixedOutputReset::finalize_into_reset(self, out);
    }

    fn restart(&mut self) {
        Reset::reset(self);
    }
}

/// Abstraction over the ED2K hash flavor
pub trait Ed2kColor: Sized + Default {
    /// Size of the output hash
    type OutputSize: ArrayLength<u8> + 'static;
    /// Flavor-specific finalization of the hash state
    fn finalize_ref<D: BlockDigest>(
        state: &Ed2kState<D>,
        out: &mut Array<Self::OutputSize>,
    ) -> Result<(), D::Error>;
}

/// The old, "buggy" ED2K hashing algorithm. See crate docs for more details.
#[derive(Default, Debug, Clone, Copy)]
pub struct Red;

/// The new, "fixed" ED2K hashing algorithm. See crate docs for more details.
#[derive(Default, Debug, Clone, Copy)]
pub struct Blue;

/// The `Red` hash concatenated with the `Blue` hash.
/// See crate docs for more details.
#[derive(Default, Debug, Clone, Copy)]
pub struct RedBlue;

/// Internal hash state
#[derive(Debug, Clone)]
pub struct Ed2kState<D> {
    /// Hasher for the current chunk
    chunk_hasher: D,
    /// Length of the currently hashed bytes of the chunk
    chunk_len: usize,
    /// Digests of the chunks before the current one
    chunk_list: Vec<ChunkDigest>,
    /// Digest of the empty byte sequence under `D`
    empty_chunk: ChunkDigest,
}

impl<D: BlockDigest> Default for Ed2kState<D> {
    fn default() -> Self {
        let chunk_hasher = D::default();
        let mut empty_chunk = ChunkDigest::default();
        chunk_hasher.finish(&mut empty_chunk);
        Self {
            chunk_hasher,
            chunk_len: 0,
            chunk_list: Vec::new(),
            empty_chunk,
        }
    }
}

impl<D: BlockDigest> Ed2kState<D> {
    fn write(&mut self, mut data: &[u8]) -> Result<usize, Error<D::Error>> {
        let mut absorbed = 0;
        while !data.is_empty() {
            let data_write;
            if self.chunk_len == CHUNK_SIZE {
                // the current chunk is full and more data follows, so it
                // can be moved to the list
                (data_write, data) = data.split_at(data.len().min(CHUNK_SIZE));
                self.roll_chunk(data_write)
                    .map_err(|source| Error::DigestEngineFailure { absorbed, source })?;
                self.chunk_len = data_write.len();
            } else {
                let free = CHUNK_SIZE - self.chunk_len;
                (data_write, data) = data.split_at(data.len().min(free));
                self.chunk_hasher
                    .absorb(data_write)
                    .map_err(|source| Error::DigestEngineFailure { absorbed, source })?;
                self.chunk_len += data_write.len();
            }
            absorbed += data_write.len();
        }
        Ok(absorbed)
    }

    /// Start the next chunk with `head` and push the digest of the full one.
    ///
    /// Nothing changes if `head` cannot be absorbed.
    fn roll_chunk(&mut self, head: &[u8]) -> Result<(), D::Error> {
        debug_assert_eq!(self.chunk_len, CHUNK_SIZE);
        let mut next = D::default();
        next.absorb(head)?;
        let mut full = mem::replace(&mut self.chunk_hasher, next);
        let mut hash = ChunkDigest::default();
        full.finish_reset(&mut hash);
        log::trace!("ed2k chunk {} done: {:x}", self.chunk_list.len(), hash);
        self.chunk_list.push(hash);
        Ok(())
    }

    fn current_chunk(&self) -> ChunkDigest {
        let mut hash = ChunkDigest::default();
        self.chunk_hasher.finish(&mut hash);
        hash
    }

    /// Hash the chunk list followed by `tail`.
    fn list_hash(&self, tail: &[ChunkDigest]) -> Result<ChunkDigest, D::Error> {
        let mut list_hasher = D::default();
        for hash in self.chunk_list.iter().chain(tail) {
            list_hasher.absorb(hash)?;
        }
        log::trace!(
            "ed2k list of {} chunks, tail {:x?}",
            self.chunk_list.len() + tail.len(),
            tail
        );
        let mut out = ChunkDigest::default();
        list_hasher.finish_reset(&mut out);
        Ok(out)
    }

    fn blue(&self) -> Result<ChunkDigest, D::Error> {
        // simple case: input data was at most one chunk.
        // state: |##> |
        let current = self.current_chunk();
        if self.chunk_list.is_empty() {
            return Ok(current);
        }

        // the current chunk always ends the list, even an empty one
        // state: |####|..|##> |
        self.list_hash(&[current])
    }

    fn red(&self) -> Result<ChunkDigest, D::Error> {
        let current = self.current_chunk();

        // Input ends on a chunk boundary. The full chunk is still pending,
        // and old clients append the hash of the empty byte sequence after
        // it. This also applies to an input of exactly one chunk.
        // state: |####|..|####>|
        if self.chunk_len == CHUNK_SIZE {
            return self.list_hash(&[current, self.empty_chunk]);
        }

        // otherwise same as blue
        // state: |##> |  or  |####|..|##> |
        if self.chunk_list.is_empty() {
            return Ok(current);
        }
        self.list_hash(&[current])
    }

    fn reset(&mut self) {
        self.chunk_hasher.restart();
        self.chunk_len = 0;
        self.chunk_list.clear();
    }
}

/// ED2K hash algorithm implementation. This implements all the relevant
/// traits from the `digest` crate to be usable as a hasher.
///
/// The concrete ED2K hash produced through the `digest` traits depends on the
/// type parameter `C`. `D` is the block engine, MD4 unless replaced.
#[derive(Debug, Clone)]
pub struct Ed2kImpl<C, D = Md4> {
    state: Ed2kState<D>,
    _color: C,
}

fn engine_failure<E>(source: E) -> Error<E> {
    Error::DigestEngineFailure {
        absorbed: 0,
        source,
    }
}

impl<C, D> Default for Ed2kImpl<C, D>
where
    C: Ed2kColor,
    D: BlockDigest,
{
    fn default() -> Self {
        Self {
            state: Default::default(),
            _color: Default::default(),
        }
    }
}

impl<C, D> Ed2kImpl<C, D>
where
    C: Ed2kColor,
    D: BlockDigest,
{
    /// Create an empty hasher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb `data`, returning the number of bytes absorbed.
    ///
    /// The result does not depend on how the input is split across calls.
    /// On engine failure the error carries the number of bytes of `data`
    /// that were absorbed; writing the rest again continues the hash.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, Error<D::Error>> {
        self.state.write(data)
    }

    /// The plain ED2K hash of everything written so far. Same as
    /// [`sum_blue`](Self::sum_blue).
    pub fn sum(&self) -> Result<ChunkDigest, Error<D::Error>> {
        self.sum_blue()
    }

    /// Append the plain hash to `buf`, keeping its existing contents.
    pub fn append_sum(&self, buf: &mut Vec<u8>) -> Result<(), Error<D::Error>> {
        let hash = self.sum()?;
        buf.extend_from_slice(&hash);
        Ok(())
    }

    /// The "fixed" hash. Does not change the hasher.
    pub fn sum_blue(&self) -> Result<ChunkDigest, Error<D::Error>> {
        self.state.blue().map_err(engine_failure)
    }

    /// The "fixed" hash as 32 lowercase hex characters.
    pub fn sum_blue_hex(&self) -> Result<String, Error<D::Error>> {
        Ok(to_hex(&self.sum_blue()?))
    }

    /// The old, "buggy" hash. Does not change the hasher.
    pub fn sum_red(&self) -> Result<ChunkDigest, Error<D::Error>> {
        self.state.red().map_err(engine_failure)
    }

    /// The old, "buggy" hash as 32 lowercase hex characters.
    pub fn sum_red_hex(&self) -> Result<String, Error<D::Error>> {
        Ok(to_hex(&self.sum_red()?))
    }

    /// The red hash followed by the blue hash.
    pub fn sum_red_blue(&self) -> Result<Array<U32>, Error<D::Error>> {
        let mut out = Array::<U32>::default();
        RedBlue::finalize_ref(&self.state, &mut out).map_err(engine_failure)?;
        Ok(out)
    }

    /// Drop all written data. The chunk list keeps its allocation.
    pub fn reset(&mut self) {
        log::debug!(
            "ed2k reset after {} bytes in {} chunks",
            self.total_len(),
            self.state.chunk_list.len()
        );
        self.state.reset();
    }

    /// Size of the produced digest, always 16.
    pub fn digest_size(&self) -> usize {
        DIGEST_SIZE
    }

    /// Size of a chunk, always 9728000.
    pub fn chunk_size(&self) -> usize {
        CHUNK_SIZE
    }

    /// Digests of the chunks that were completed and followed by more data.
    ///
    /// The current chunk is not included, even when it is full.
    pub fn chunk_digests(&self) -> &[ChunkDigest] {
        &self.state.chunk_list
    }

    /// Digests of all chunks, including the current one.
    ///
    /// This is the part hash list ed2k clients exchange for a file.
    pub fn hashset(&self) -> Vec<ChunkDigest> {
        let mut hashes = Vec::with_capacity(self.state.chunk_list.len() + 1);
        hashes.extend_from_slice(&self.state.chunk_list);
        hashes.push(self.state.current_chunk());
        hashes
    }

    /// Total number of bytes written since creation or the last reset.
    pub fn total_len(&self) -> u64 {
        self.state.chunk_list.len() as u64 * CHUNK_SIZE as u64 + self.state.chunk_len as u64
    }

    /// Number of bytes in the current chunk, between 0 and [`CHUNK_SIZE`].
    pub fn pending_len(&self) -> usize {
        self.state.chunk_len
    }
}

impl<C, D> io::Write for Ed2kImpl<C, D>
where
    C: Ed2kColor,
    D: BlockDigest,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.state.write(buf) {
            Ok(n) => Ok(n),
            // report the partial write, the retry surfaces the error
            Err(err) if err.absorbed() > 0 => Ok(err.absorbed()),
            Err(err) => Err(err.into()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<C, D> Update for Ed2kImpl<C, D>
where
    C: Ed2kColor,
    D: BlockDigest<Error = Infallible>,
{
    fn update(&mut self, data: &[u8]) {
        infallible(self.state.write(data));
    }
}

impl<C, D> FixedOutput for Ed2kImpl<C, D>
where
    C: Ed2kColor,
    D: BlockDigest<Error = Infallible>,
{
    fn finalize_into(self, out: &mut Array<Self::OutputSize>) {
        infallible(C::finalize_ref(&self.state, out).map_err(engine_failure))
    }
}

impl<C, D> OutputSizeUser for Ed2kImpl<C, D>
where
    C: Ed2kColor,
{
    type OutputSize = C::OutputSize;
}

impl<C, D> HashMarker for Ed2kImpl<C, D>
where
    C: Ed2kColor,
    D: BlockDigest,
{
}

impl<C, D> Reset for Ed2kImpl<C, D>
where
    C: Ed2kColor,
    D: BlockDigest,
{
    fn reset(&mut self) {
        Ed2kImpl::reset(self);
    }
}

impl<C, D> FixedOutputReset for Ed2kImpl<C, D>
where
    C: Ed2kColor,
    D: BlockDigest<Error = Infallible>,
{
    fn finalize_into_reset(&mut self, out: &mut Array<Self::OutputSize>) {
        infallible(C::finalize_ref(&self.state, out).map_err(engine_failure));
        Ed2kImpl::reset(self);
    }
}

impl Ed2kColor for Red {
    type OutputSize = U16;
    fn finalize_ref<D: BlockDigest>(
        state: &Ed2kState<D>,
        out: &mut Array<U16>,
    ) -> Result<(), D::Error> {
        out.copy_from_slice(&state.red()?);
        Ok(())
    }
}

impl Ed2kColor for Blue {
    type OutputSize = U16;
    fn finalize_ref<D: BlockDigest>(
        state: &Ed2kState<D>,
        out: &mut Array<U16>,
    ) -> Result<(), D::Error> {
        out.copy_from_slice(&state.blue()?);
        Ok(())
    }
}

impl Ed2kColor for RedBlue {
    type OutputSize = U32;
    fn finalize_ref<D: BlockDigest>(
        state: &Ed2kState<D>,
        out: &mut Array<U32>,
    ) -> Result<(), D::Error> {
        // split the output array into two parts
        let (red_out, blue_out) = out.split_at_mut(DIGEST_SIZE);

        // the two only differ when input ends on a chunk boundary
        // state: |####|..|####>|
        let blue = state.blue()?;
        if state.chunk_len == CHUNK_SIZE {
            red_out.copy_from_slice(&state.red()?);
        } else {
            red_out.copy_from_slice(&blue);
        }
        blue_out.copy_from_slice(&blue);
        Ok(())
    }
}
