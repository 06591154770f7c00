//! HTTP服务器设置模块
//! 负责绑定监听地址、创建路由和优雅关闭

use crate::api::routes;
use crate::util::config::ServerConfig;
use crate::AppState;
use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

/// HTTP服务器管理器
pub struct ServerManager;

impl ServerManager {
    /// 创建HTTP服务器
    pub async fn create_server(server_config: &ServerConfig, app_state: AppState) -> Result<HttpServer> {
        info!(
            target: "server.http",
            event = "http.server.create",
            "创建HTTP服务器"
        );

        let listener = Self::bind_listener(&server_config.host, server_config.port).await?;
        let local_addr = listener.local_addr()?;

        info!(
            target: "server.http",
            event = "http.router.build"
        );
        let app_routes = routes(app_state);

        info!(
            target: "server.http",
            event = "http.server.ready",
            address = %local_addr
        );

        Ok(HttpServer {
            listener,
            app_routes,
            local_addr,
        })
    }

    /// 绑定监听端口
    ///
    /// 通配地址优先尝试 IPv6 双栈，失败再降级 IPv4；其他地址直接绑定。
    async fn bind_listener(host: &str, port: u16) -> Result<TcpListener> {
        info!(
            target: "server.http",
            event = "http.server.bind_start",
            host = host,
            port
        );

        if !is_wildcard_host(host) {
            let addr = if host.contains(':') && !host.starts_with('[') {
                format!("[{}]:{}", host, port)
            } else {
                format!("{}:{}", host, port)
            };
            let listener = TcpListener::bind(&addr)
                .await
                .map_err(|e| anyhow::anyhow!("地址 {} 绑定失败: {}", addr, e))?;
            info!(
                target: "server.http",
                event = "http.server.bound",
                address = %addr
            );
            return Ok(listener);
        }

        let v6_addr = format!("[::]:{}", port);
        match TcpListener::bind(&v6_addr).await {
            Ok(listener) => {
                info!(
                    target: "server.http",
                    event = "http.server.bound",
                    protocol = "ipv6",
                    address = %v6_addr
                );
                Ok(listener)
            }
            Err(e6) => {
                warn!("IPv6绑定失败: {}，尝试IPv4", e6);
                let v4_addr = format!("0.0.0.0:{}", port);
                let listener = TcpListener::bind(&v4_addr).await.map_err(|e4| {
                    anyhow::anyhow!(
                        "端口 {} 绑定失败 (IPv4): {}；之前IPv6错误: {}",
                        port,
                        e4,
                        e6
                    )
                })?;
                info!(
                    target: "server.http",
                    event = "http.server.bound",
                    protocol = "ipv4",
                    address = %v4_addr
                );
                Ok(listener)
            }
        }
    }

    /// 启动服务器
    pub async fn start_server(server: HttpServer) -> Result<()> {
        info!(
            target: "server.http",
            event = "http.server.start",
            address = %server.local_addr
        );

        axum::serve(server.listener, server.app_routes)
            .with_graceful_shutdown(Self::shutdown_signal())
            .await?;

        info!("HTTP服务器已关闭");
        Ok(())
    }

    /// 优雅关闭信号处理
    async fn shutdown_signal() {
        info!(
            target: "server.http",
            event = "http.server.shutdown_wait"
        );

        tokio::select! {
            _ = ctrl_c() => {
                info!(
                    target: "server.http",
                    event = "http.server.signal",
                    signal = "SIGINT"
                );
            }
            _ = Self::wait_for_sigterm() => {
                info!(
                    target: "server.http",
                    event = "http.server.signal",
                    signal = "SIGTERM"
                );
            }
        }

        // 正在进行的上传/轮询请求会在关闭前处理完毕
        info!(
            target: "server.http",
            event = "http.server.shutdown_begin"
        );
    }

    /// 等待 SIGTERM 信号
    async fn wait_for_sigterm() -> Result<(), Box<dyn std::error::Error>> {
        #[cfg(unix)]
        {
            let mut term_signal = signal(SignalKind::terminate())?;
            term_signal.recv().await;
            Ok(())
        }
        #[cfg(not(unix))]
        {
            std::future::pending::<()>().await;
            Ok(())
        }
    }
}

fn is_wildcard_host(host: &str) -> bool {
    matches!(host.trim(), "" | "0.0.0.0" | "::" | "[::]")
}

/// HTTP服务器实例
pub struct HttpServer {
    listener: TcpListener,
    app_routes: Router,
    local_addr: std::net::SocketAddr,
}

impl HttpServer {
    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.local_addr
    }
}
