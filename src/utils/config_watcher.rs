use notify::{EventKind, RecursiveMode, Watcher};
use std::{path::Path, sync::mpsc, time::Duration};
use tracing::{debug, error, info};

use crate::{config::Settings, error::Result};

/// Quiet period after the last file event before the config is reloaded
const DEBOUNCE: Duration = Duration::from_millis(200);
/// How often the stop signal is checked while nothing happens
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// 启动配置文件监听
///
/// Events are debounced, the file is read again once writes settled and
/// the parsed result is handed to `callback`.
///
/// # 参数
///
/// * `config_path` - 配置文件路径
/// * `callback` - 配置文件变化时的回调函数
///
/// # 返回值
///
/// 返回一个发送器，用于发送停止信号
pub fn start_config_watcher(
    config_path: impl AsRef<Path>,
    callback: impl Fn(Result<Settings>) + Send + 'static,
) -> Result<mpsc::Sender<()>, notify::Error> {
    let (stop_tx, stop_rx) = mpsc::channel();
    let config_path = config_path.as_ref().to_owned();

    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx)?;
    watcher.watch(&config_path, RecursiveMode::NonRecursive)?;
    info!("Watching config file: {:?}", config_path);

    std::thread::spawn(move || {
        let mut pending = false;

        loop {
            // 检查是否有停止信号
            if stop_rx.try_recv().is_ok() {
                info!("Stopping config watcher");
                break;
            }

            let timeout = if pending { DEBOUNCE } else { POLL_INTERVAL };
            match rx.recv_timeout(timeout) {
                Ok(Ok(event)) => {
                    debug!("Config file event: {:?}", event);
                    // 文件被删除或重命名后需要重新 watch
                    if matches!(
                        event.kind,
                        EventKind::Remove(_) | EventKind::Modify(notify::event::ModifyKind::Name(_))
                    ) {
                        if let Err(e) = watcher.unwatch(&config_path) {
                            debug!("Failed to unwatch config file (ignored): {:?}", e);
                        }
                        if let Err(e) = watcher.watch(&config_path, RecursiveMode::NonRecursive) {
                            error!("Failed to re-watch config file: {:?}", e);
                        } else {
                            info!("Re-watching config file: {:?}", config_path);
                        }
                    }
                    if !matches!(event.kind, EventKind::Access(_)) {
                        pending = true;
                    }
                }
                Ok(Err(e)) => error!("Watch error: {:?}", e),
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    error!("Watcher channel disconnected");
                    break;
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if pending {
                        pending = false;
                        info!("Config file changed: {:?}", config_path);
                        callback(Settings::new(&config_path));
                    }
                }
            }
        }

        if let Err(e) = watcher.unwatch(&config_path) {
            debug!("Failed to unwatch config file: {:?}", e);
        }
    });

    Ok(stop_tx)
}
