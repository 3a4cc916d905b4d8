use osmpbf::{BlobDecode, BlobReader, PrimitiveBlock};
use rayon::iter::{ParallelBridge, ParallelIterator};

/// Decodes every data block of a PBF file, applies `op` to each, and returns
/// the results in file order. Blocks are decoded in parallel; the enumeration
/// index restores the on-disk order afterwards so callers see a deterministic
/// scan regardless of worker scheduling.
pub(crate) fn map_blocks<T, FMO>(path: &str, op: FMO) -> Result<Vec<T>, osmpbf::Error>
where
    T: Send,
    FMO: Fn(&PrimitiveBlock) -> T + Send + Sync,
{
    let mut blocks: Vec<(usize, T)> = BlobReader::from_path(path)?
        .enumerate()
        .par_bridge()
        .filter_map(|(index, blob)| {
            let blob = match blob {
                Ok(blob) => blob,
                Err(e) => return Some(Err(e)),
            };
            match blob.decode() {
                Ok(BlobDecode::OsmData(block)) => Some(Ok((index, op(&block)))),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            }
        })
        .collect::<Result<Vec<(usize, T)>, osmpbf::Error>>()?;

    blocks.sort_unstable_by_key(|(index, _)| *index);
    Ok(blocks.into_iter().map(|(_, block)| block).collect())
}
