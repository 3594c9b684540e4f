// 请求与响应快照
pub mod request;
// 缓存存储接口
pub mod storage;
// 进程内缓存存储
pub mod memory;
// 网络请求
pub mod fetch;
// 旧缓存清理策略
pub mod retention;
// install / fetch / activate
pub mod interceptor;
// worker 版本生命周期
pub mod registration;

pub use fetch::{Fetcher, HttpFetcher};
pub use interceptor::{CacheInterceptor, Intercepted, ResponseSource, Revalidation, WorkerConfig};
pub use memory::MemoryCacheStorage;
pub use registration::{Registration, WorkerState};
pub use request::{CacheRequest, CachedResponse};
pub use retention::Retention;
pub use storage::{Cache, CacheStorage, add_all};
