use flate2::read::GzDecoder;
use fs_err as fs;
use go_vendor_utils::manifest::Dependency;
use sha2::{
    digest::{generic_array::GenericArray, OutputSizeUser},
    Digest, Sha256,
};
use std::io::{self, Read};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tar::Archive;

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error("HTTP error while fetching dependency: {0}")]
    Http(#[from] Box<ureq::Error>),

    #[error("Error reading archive entries: {0}")]
    Entries(std::io::Error),

    #[error("Error reading archive entry: {0}")]
    Entry(std::io::Error),

    #[error("Error writing archive entry: {0}")]
    Unpack(std::io::Error),

    #[error("Error reading dependency download: {0}")]
    Read(std::io::Error),

    #[error("Error writing dependency executable: {0}")]
    Write(std::io::Error),

    #[error("{0} is not an archive and doesn't declare an executable path")]
    MissingExecutable(String),

    #[error("dependency sha256 mismatch: expected sha256 {0}, actual sha256 {1}")]
    Checksum(String, String),
}

/// Fetches a dependency from its uri and installs it into `dest_dir`,
/// verifying the declared checksum, if any, along the way. Archives are
/// extracted; anything else is written as an executable at the dependency's
/// `executable` path. Nothing is buffered in memory or in temporary files.
/// In an error scenario, anything already written will not be removed.
///
/// # Errors
///
/// See `Error` for an enumeration of error scenarios.
pub(crate) fn fetch_verify_install(dependency: &Dependency, dest_dir: &Path) -> Result<(), Error> {
    let body = ureq::get(&dependency.uri)
        .call()
        .map_err(Box::new)?
        .into_reader();
    install_verify(body, dependency, dest_dir)
}

fn install_verify(body: impl Read, dependency: &Dependency, dest_dir: &Path) -> Result<(), Error> {
    let mut reader = DigestingReader::new(body, Sha256::new());

    if dependency.is_archive() {
        extract(&mut reader, dest_dir)?;
    } else {
        let executable = dependency
            .executable
            .as_ref()
            .ok_or_else(|| Error::MissingExecutable(dependency.to_string()))?;
        write_executable(&mut reader, &dest_dir.join(executable))?;
    }

    let actual_digest = reader.finalize();
    match &dependency.checksum {
        Some(checksum) if actual_digest.to_vec() != checksum.value => Err(Error::Checksum(
            hex::encode(&checksum.value),
            hex::encode(actual_digest),
        )),
        _ => Ok(()),
    }
}

fn extract(reader: impl Read, dest_dir: &Path) -> Result<(), Error> {
    fs::create_dir_all(dest_dir).map_err(Error::Unpack)?;

    let mut archive = Archive::new(GzDecoder::new(reader));
    for entry in archive.entries().map_err(Error::Entries)? {
        entry
            .map_err(Error::Entry)?
            .unpack_in(dest_dir)
            .map_err(Error::Unpack)?;
    }

    // tar stops at the end-of-archive marker; the digest has to cover the
    // whole download.
    io::copy(&mut archive.into_inner(), &mut io::sink()).map_err(Error::Read)?;
    Ok(())
}

fn write_executable(reader: &mut impl Read, path: &Path) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(Error::Write)?;
    }
    let mut file = fs::File::create(path).map_err(Error::Write)?;
    io::copy(reader, &mut file).map_err(Error::Read)?;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).map_err(Error::Write)
}

struct DigestingReader<R: Read, H: sha2::Digest> {
    r: R,
    h: H,
}

impl<R: Read, H: sha2::Digest> DigestingReader<R, H> {
    pub(crate) fn new(reader: R, hasher: H) -> DigestingReader<R, H> {
        DigestingReader {
            r: reader,
            h: hasher,
        }
    }
    pub(crate) fn finalize(self) -> GenericArray<u8, <H as OutputSizeUser>::OutputSize> {
        self.h.finalize()
    }
}

impl<R: Read, H: sha2::Digest> Read for DigestingReader<R, H> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.r.read(buf)?;
        self.h.update(&buf[..n]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn tgz(files: &[(&str, &str)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (path, contents) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder
                .append_data(&mut header, path, contents.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn dependency(uri: &str, body: &[u8], executable: Option<&str>) -> Dependency {
        Dependency {
            name: "glide".to_string(),
            version: "0.13.3".to_string(),
            uri: uri.to_string(),
            checksum: Some(
                format!("sha256:{}", hex::encode(Sha256::digest(body)))
                    .parse()
                    .unwrap(),
            ),
            executable: executable.map(String::from),
        }
    }

    #[test]
    fn extracts_and_verifies_archive() {
        let body = tgz(&[("go/bin/go", "#!/bin/sh\n"), ("go/VERSION", "go1.22.7")]);
        let dest = tempfile::tempdir().unwrap();

        install_verify(
            body.as_slice(),
            &dependency("https://example.com/go.tar.gz", &body, None),
            dest.path(),
        )
        .unwrap();

        assert_eq!(
            "go1.22.7",
            fs::read_to_string(dest.path().join("go/VERSION")).unwrap()
        );
        assert!(dest.path().join("go/bin/go").exists());
    }

    #[test]
    fn writes_plain_executable() {
        let body = b"#!/bin/sh\necho dep\n";
        let dest = tempfile::tempdir().unwrap();

        install_verify(
            body.as_slice(),
            &dependency("https://example.com/dep-linux-amd64", body, Some("bin/dep")),
            dest.path(),
        )
        .unwrap();

        let path = dest.path().join("bin/dep");
        assert_eq!(body.as_slice(), fs::read(&path).unwrap());
        assert_eq!(
            0o755,
            fs::metadata(&path).unwrap().permissions().mode() & 0o777
        );
    }

    #[test]
    fn plain_download_needs_executable_path() {
        let dest = tempfile::tempdir().unwrap();
        let err = install_verify(
            b"binary".as_slice(),
            &dependency("https://example.com/dep-linux-amd64", b"binary", None),
            dest.path(),
        )
        .unwrap_err();
        assert_eq!(
            "glide 0.13.3 is not an archive and doesn't declare an executable path",
            err.to_string()
        );
    }

    #[test]
    fn checksum_mismatch() {
        let dest = tempfile::tempdir().unwrap();
        let expected = hex::encode(Sha256::digest(b"something else"));
        let actual = hex::encode(Sha256::digest(b"binary"));

        let err = install_verify(
            b"binary".as_slice(),
            &dependency(
                "https://example.com/dep-linux-amd64",
                b"something else",
                Some("bin/dep"),
            ),
            dest.path(),
        )
        .unwrap_err();
        assert_eq!(
            format!("dependency sha256 mismatch: expected sha256 {expected}, actual sha256 {actual}"),
            err.to_string()
        );
    }

    #[test]
    fn missing_checksum_is_not_verified() {
        let dest = tempfile::tempdir().unwrap();
        let mut unverified =
            dependency("https://example.com/godep_linux_amd64", b"", Some("bin/godep"));
        unverified.checksum = None;

        install_verify(b"godep".as_slice(), &unverified, dest.path()).unwrap();
        assert!(dest.path().join("bin/godep").exists());
    }

    #[test]
    fn test_fetch_verify_install() {
        let dependency = Dependency {
            name: "git".to_string(),
            version: "0.0.1".to_string(),
            uri: "https://mirrors.edge.kernel.org/pub/software/scm/git/git-0.01.tar.gz"
                .to_string(),
            checksum: Some(
                "sha256:9bdf8a4198b269c5cbe4263b1f581aae885170a6cb93339a2033cb468e57dcd3"
                    .parse()
                    .unwrap(),
            ),
            executable: None,
        };
        let dest = tempfile::tempdir().expect("Couldn't create test tmpdir");

        fetch_verify_install(&dependency, dest.path())
            .expect("Expected to fetch, verify, and extract");

        assert!(dest.path().join("git-0.01").join("README").exists());
    }
}
