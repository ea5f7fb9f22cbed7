//! Digest command - hash a local file

use crate::cli::args::{AlgorithmArg, DigestArgs};
use crate::digest::{hex_digest, DigestAlgorithm};
use crate::error::CacheResult;

/// Execute the digest command
pub fn execute(args: DigestArgs) -> CacheResult<()> {
    let algorithm = match args.algorithm {
        AlgorithmArg::Md5 => DigestAlgorithm::Md5,
        AlgorithmArg::Sha256 => DigestAlgorithm::Sha256,
    };
    let digest = hex_digest(&args.path, algorithm)?;
    println!("{}  {}", digest, args.path.display());
    Ok(())
}
