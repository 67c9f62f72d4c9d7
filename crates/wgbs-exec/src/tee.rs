use tokio::{
    fs::File,
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    task::JoinHandle,
};
use tracing::warn;

/// Copy `reader` line by line to `console` and, if present, to `log`.
///
/// Lines are passed through as raw bytes, whatever their encoding. A final
/// line without a terminator gets one. A failing log write disables the log
/// copy; console output continues. After a read error the rest of the stream
/// is discarded, so the writer never sees a closed pipe.
pub(crate) fn spawn_tee<R, W>(
    stream: &'static str,
    reader: R,
    mut console: W,
    mut log: Option<File>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::with_capacity(256);
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!(target: "wgbs.exec.tee", stream, error = %e, "engine output read failed; discarding the rest");
                    if let Err(e) = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await {
                        warn!(target: "wgbs.exec.tee", stream, error = %e, "engine output drain failed");
                    }
                    break;
                }
            }
            if buf.last() != Some(&b'\n') {
                buf.push(b'\n');
            }

            let _ = console.write_all(&buf).await;
            let _ = console.flush().await;

            if let Some(file) = log.as_mut()
                && let Err(e) = file.write_all(&buf).await
            {
                warn!(target: "wgbs.exec.tee", stream, error = %e, "run log write failed; continuing without it");
                log = None;
            }
        }
        if let Some(mut file) = log {
            let _ = file.flush().await;
        }
    })
}
