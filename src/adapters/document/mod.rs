//! Invoice document renderers.

mod http_invoice_renderer;
mod mock_invoice_renderer;

pub use http_invoice_renderer::HttpInvoiceRenderer;
pub use mock_invoice_renderer::MockInvoiceRenderer;
