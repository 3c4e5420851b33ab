//! Browser control for studio scenarios.
//!
//! With the `browser` feature, [`StudioBrowser`] launches Chromium through
//! chromiumoxide and hands out one [`ChromiumDriver`] per scenario, each in
//! its own browser context. Without it, launching fails with a hint to
//! rebuild.

use serde::{Deserialize, Serialize};

/// Browser launch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// User agent string
    pub user_agent: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1440,
            viewport_height: 900,
            chromium_path: None,
            user_agent: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

/// Script snapshotting every element of a query as `ElementSnapshot` JSON.
///
/// Boxes are in viewport coordinates, which is what CDP mouse events use.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn snapshot_script(query_all: &str) -> String {
    format!(
        r"(() => {{
  const els = {query_all};
  return els.map((el) => {{
    const r = el.getBoundingClientRect();
    const style = window.getComputedStyle(el);
    const visible = r.width > 0 && r.height > 0
      && style.visibility !== 'hidden' && style.display !== 'none';
    let receivesPointer = false;
    if (visible) {{
      const top = document.elementFromPoint(r.left + r.width / 2, r.top + r.height / 2);
      receivesPointer = !!top && (top === el || el.contains(top));
    }}
    const attributes = {{}};
    for (const a of el.attributes) attributes[a.name] = a.value;
    return {{
      tag: el.tagName.toLowerCase(),
      text: el.innerText ?? el.textContent ?? '',
      value: typeof el.value === 'string' ? el.value : null,
      attributes,
      visible,
      enabled: !el.disabled,
      checked: !!el.checked,
      boundingBox: visible ? {{ x: r.left, y: r.top, width: r.width, height: r.height }} : null,
      receivesPointer,
    }};
  }});
}})()"
    )
}

/// Script focusing and clearing the first match; `false` if none
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn clear_script(query_all: &str) -> String {
    format!(
        r"(() => {{
  const el = ({query_all})[0];
  if (!el) return false;
  el.scrollIntoView({{ block: 'center' }});
  el.focus();
  el.value = '';
  el.dispatchEvent(new Event('input', {{ bubbles: true }}));
  return true;
}})()"
    )
}

/// Script firing `change` on the first match after text insertion
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn commit_script(query_all: &str) -> String {
    format!(
        r"(() => {{
  const el = ({query_all})[0];
  if (el) el.dispatchEvent(new Event('change', {{ bubbles: true }}));
  return !!el;
}})()"
    )
}

/// Script scrolling the first match into the middle of the viewport
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn scroll_script(query_all: &str) -> String {
    format!(
        r"(() => {{
  const el = ({query_all})[0];
  if (el) el.scrollIntoView({{ block: 'center', inline: 'center' }});
  return !!el;
}})()"
    )
}

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
#[allow(clippy::significant_drop_tightening, clippy::missing_errors_doc)]
mod cdp {
    use super::{clear_script, commit_script, scroll_script, snapshot_script, BrowserConfig};
    use crate::driver::{ElementSnapshot, Screenshot, StudioDriver};
    use crate::locator::Selector;
    use crate::result::{StudioError, StudioResult};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
    use chromiumoxide::cdp::browser_protocol::input::InsertTextParams;
    use chromiumoxide::cdp::browser_protocol::page::{
        CaptureScreenshotFormat, CaptureScreenshotParams,
    };
    use chromiumoxide::cdp::browser_protocol::target::{
        CreateBrowserContextParams, CreateTargetParams,
    };
    use chromiumoxide::layout::Point as CdpPoint;
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    fn driver_err(e: impl std::fmt::Display) -> StudioError {
        StudioError::driver(e.to_string())
    }

    /// Launched Chromium shared by every worker
    #[derive(Debug)]
    pub struct StudioBrowser {
        config: BrowserConfig,
        inner: Arc<Mutex<CdpBrowser>>,
        handle: tokio::task::JoinHandle<()>,
    }

    impl StudioBrowser {
        /// Launch Chromium
        ///
        /// # Errors
        ///
        /// Returns error if browser cannot be launched
        pub async fn launch(config: BrowserConfig) -> StudioResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.viewport_width, config.viewport_height);

            if !config.headless {
                builder = builder.with_head();
            }

            if !config.sandbox {
                builder = builder.no_sandbox();
            }

            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            if let Some(ref ua) = config.user_agent {
                builder = builder.arg(format!("--user-agent={ua}"));
            }

            let cdp_config = builder
                .build()
                .map_err(|message| StudioError::BrowserLaunch { message })?;

            let (browser, mut handler) =
                CdpBrowser::launch(cdp_config)
                    .await
                    .map_err(|e| StudioError::BrowserLaunch {
                        message: e.to_string(),
                    })?;

            let handle = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            tracing::info!(headless = config.headless, "browser launched");
            Ok(Self {
                config,
                inner: Arc::new(Mutex::new(browser)),
                handle,
            })
        }

        /// Open a blank page in a fresh browser context
        ///
        /// # Errors
        ///
        /// Returns error if the context or page cannot be created
        pub async fn new_driver(&self) -> StudioResult<ChromiumDriver> {
            let mut browser = self.inner.lock().await;
            let context = browser
                .create_browser_context(CreateBrowserContextParams::default())
                .await
                .map_err(driver_err)?;
            let target = CreateTargetParams::builder()
                .url("about:blank")
                .browser_context_id(context.clone())
                .build()
                .map_err(StudioError::driver)?;
            let page = browser.new_page(target).await.map_err(driver_err)?;
            tracing::debug!(context = ?context, "opened isolated page");

            Ok(ChromiumDriver {
                page: Arc::new(Mutex::new(page)),
                context,
            })
        }

        /// Dispose a driver's browser context
        pub async fn release(&self, driver: ChromiumDriver) {
            let browser = self.inner.lock().await;
            if let Err(e) = browser.dispose_browser_context(driver.context).await {
                tracing::warn!(error = %e, "failed to dispose browser context");
            }
        }

        /// Get the browser configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        /// Close the browser
        pub async fn close(self) -> StudioResult<()> {
            let mut browser = self.inner.lock().await;
            browser.close().await.map_err(|e| StudioError::BrowserLaunch {
                message: e.to_string(),
            })?;
            let _ = browser.wait().await;
            self.handle.abort();
            Ok(())
        }
    }

    /// [`StudioDriver`] over one CDP page
    #[derive(Debug, Clone)]
    pub struct ChromiumDriver {
        page: Arc<Mutex<CdpPage>>,
        context: BrowserContextId,
    }

    impl ChromiumDriver {
        async fn evaluate<T: serde::de::DeserializeOwned>(&self, script: String) -> StudioResult<T> {
            let page = self.page.lock().await;
            page.evaluate(script)
                .await
                .map_err(driver_err)?
                .into_value()
                .map_err(driver_err)
        }
    }

    #[async_trait]
    impl StudioDriver for ChromiumDriver {
        async fn navigate(&self, url: &str) -> StudioResult<()> {
            let page = self.page.lock().await;
            page.goto(url)
                .await
                .map_err(|e| StudioError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok(())
        }

        async fn current_url(&self) -> StudioResult<String> {
            let page = self.page.lock().await;
            Ok(page.url().await.map_err(driver_err)?.unwrap_or_default())
        }

        async fn resolve(&self, selector: &Selector) -> StudioResult<Vec<ElementSnapshot>> {
            self.evaluate(snapshot_script(&selector.to_query_all())).await
        }

        async fn click(&self, selector: &Selector) -> StudioResult<()> {
            let query = selector.to_query_all();
            let found: bool = self.evaluate(scroll_script(&query)).await?;
            if !found {
                return Err(StudioError::ElementNotFound {
                    selector: selector.key(),
                });
            }
            let first: Vec<ElementSnapshot> = self.evaluate(snapshot_script(&query)).await?;
            let center = first
                .into_iter()
                .next()
                .and_then(|el| el.bounding_box)
                .map(|b| b.center())
                .ok_or_else(|| StudioError::driver(format!("{selector} has no box to click")))?;

            let page = self.page.lock().await;
            page.click(CdpPoint::new(center.x, center.y))
                .await
                .map_err(driver_err)?;
            Ok(())
        }

        async fn fill(&self, selector: &Selector, text: &str) -> StudioResult<()> {
            let query = selector.to_query_all();
            let found: bool = self.evaluate(clear_script(&query)).await?;
            if !found {
                return Err(StudioError::ElementNotFound {
                    selector: selector.key(),
                });
            }
            {
                let page = self.page.lock().await;
                page.execute(InsertTextParams::new(text))
                    .await
                    .map_err(driver_err)?;
            }
            let _: bool = self.evaluate(commit_script(&query)).await?;
            Ok(())
        }

        async fn screenshot(&self) -> StudioResult<Screenshot> {
            let page = self.page.lock().await;
            let params = CaptureScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .build();

            let screenshot = page
                .execute(params)
                .await
                .map_err(|e| StudioError::Screenshot {
                    message: e.to_string(),
                })?;

            use base64::Engine;
            let data = base64::engine::general_purpose::STANDARD
                .decode(&screenshot.data)
                .map_err(|e| StudioError::Screenshot {
                    message: e.to_string(),
                })?;
            Ok(Screenshot::new(data, 0, 0).with_png_dimensions())
        }
    }
}

// ============================================================================
// Stub Implementation (when `browser` feature is NOT enabled)
// ============================================================================

#[cfg(not(feature = "browser"))]
#[allow(clippy::missing_const_for_fn, clippy::unused_async)]
mod stub {
    use super::BrowserConfig;
    use crate::driver::MockDriver;
    use crate::result::{StudioError, StudioResult};

    const DISABLED: &str =
        "browser support is not compiled in; rebuild with `--features browser`";

    /// Browser handle; cannot be launched without the `browser` feature
    #[derive(Debug)]
    pub struct StudioBrowser {
        config: BrowserConfig,
    }

    /// Driver type handed out by [`StudioBrowser::new_driver`]
    pub type ChromiumDriver = MockDriver;

    impl StudioBrowser {
        /// Always fails: browser support is not compiled in
        ///
        /// # Errors
        ///
        /// Always returns [`StudioError::BrowserLaunch`]
        pub async fn launch(config: BrowserConfig) -> StudioResult<Self> {
            let _ = config;
            Err(StudioError::BrowserLaunch {
                message: DISABLED.to_string(),
            })
        }

        /// Always fails: browser support is not compiled in
        ///
        /// # Errors
        ///
        /// Always returns [`StudioError::BrowserLaunch`]
        pub async fn new_driver(&self) -> StudioResult<ChromiumDriver> {
            Err(StudioError::BrowserLaunch {
                message: DISABLED.to_string(),
            })
        }

        /// No-op
        pub async fn release(&self, _driver: ChromiumDriver) {}

        /// Get the browser configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        /// No-op
        pub async fn close(self) -> StudioResult<()> {
            Ok(())
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{ChromiumDriver, StudioBrowser};

#[cfg(not(feature = "browser"))]
pub use stub::{ChromiumDriver, StudioBrowser};
