//! pdf.js bindings and the decoder seams implemented on top of them.

use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use js_sys::{Array, Object, Promise, Reflect, Uint8Array};
use serde::Serialize;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use folio_shared::{
    CancelToken, Document, DocumentLoader, OpenError, Page, PageViewport, RenderError,
    RenderOutcome,
};

use crate::surface::CanvasSurface;

const PDFJS_VERSION: &str = "3.11.174";
const PDFJS_CDN: &str = "https://cdnjs.cloudflare.com/ajax/libs/pdf.js";

/// pdf.js `PasswordResponses.INCORRECT_PASSWORD`.
const INCORRECT_PASSWORD_CODE: f64 = 2.0;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = pdfjsLib, js_name = getDocument, catch)]
    fn get_document(params: &JsValue) -> Result<LoadingTask, JsValue>;

    type LoadingTask;
    #[wasm_bindgen(method, getter)]
    fn promise(this: &LoadingTask) -> Promise;

    type PdfDocumentProxy;
    #[wasm_bindgen(method, getter, js_name = numPages)]
    fn num_pages(this: &PdfDocumentProxy) -> u32;
    #[wasm_bindgen(method, js_name = getPage)]
    fn get_page(this: &PdfDocumentProxy, number: u32) -> Promise;
    #[wasm_bindgen(method)]
    fn destroy(this: &PdfDocumentProxy) -> Promise;

    type PdfPageProxy;
    #[wasm_bindgen(method, js_name = getViewport)]
    fn get_viewport(this: &PdfPageProxy, params: &JsValue) -> PdfViewport;
    #[wasm_bindgen(method, js_name = render)]
    fn start_render(this: &PdfPageProxy, params: &JsValue) -> RenderTask;

    type PdfViewport;
    #[wasm_bindgen(method, getter)]
    fn width(this: &PdfViewport) -> f64;
    #[wasm_bindgen(method, getter)]
    fn height(this: &PdfViewport) -> f64;

    type RenderTask;
    #[wasm_bindgen(method, getter, js_name = promise)]
    fn done(this: &RenderTask) -> Promise;
    #[wasm_bindgen(method)]
    fn cancel(this: &RenderTask);
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OpenParams<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    c_map_url: String,
    c_map_packed: bool,
    standard_font_data_url: String,
}

#[derive(Serialize)]
struct ViewportParams {
    scale: f64,
}

/// Point pdf.js at its worker script. Must run before the first load.
pub fn configure_worker() -> Result<(), JsValue> {
    let lib = Reflect::get(&js_sys::global(), &JsValue::from_str("pdfjsLib"))?;
    if lib.is_undefined() {
        return Err(JsValue::from_str("pdfjsLib is not loaded"));
    }
    let options = Reflect::get(&lib, &JsValue::from_str("GlobalWorkerOptions"))?;
    let worker = format!("{PDFJS_CDN}/{PDFJS_VERSION}/pdf.worker.min.js");
    Reflect::set(&options, &JsValue::from_str("workerSrc"), &JsValue::from_str(&worker))?;
    Ok(())
}

fn error_name(err: &JsValue) -> String {
    Reflect::get(err, &JsValue::from_str("name"))
        .ok()
        .and_then(|name| name.as_string())
        .unwrap_or_default()
}

fn error_message(err: &JsValue) -> String {
    Reflect::get(err, &JsValue::from_str("message"))
        .ok()
        .and_then(|message| message.as_string())
        .or_else(|| err.as_string())
        .unwrap_or_else(|| format!("{err:?}"))
}

fn open_error(err: &JsValue, password_supplied: bool) -> OpenError {
    if error_name(err) != "PasswordException" {
        return OpenError::Corrupt(error_message(err));
    }
    let code = Reflect::get(err, &JsValue::from_str("code"))
        .ok()
        .and_then(|code| code.as_f64());
    if password_supplied || code == Some(INCORRECT_PASSWORD_CODE) {
        OpenError::WrongPassword
    } else {
        OpenError::PasswordRequired
    }
}

fn open_params(bytes: &[u8], password: Option<&str>) -> Result<JsValue, JsValue> {
    let params = serde_wasm_bindgen::to_value(&OpenParams {
        password,
        c_map_url: format!("{PDFJS_CDN}/{PDFJS_VERSION}/cmaps/"),
        c_map_packed: true,
        standard_font_data_url: format!("{PDFJS_CDN}/{PDFJS_VERSION}/standard_fonts/"),
    })?;
    // pdf.js detaches the buffer it is given, so every attempt gets a fresh copy.
    Reflect::set(&params, &JsValue::from_str("data"), &Uint8Array::from(bytes))?;
    Ok(params)
}

pub struct PdfJsLoader;

impl DocumentLoader<CanvasSurface> for PdfJsLoader {
    type Document = PdfDocument;

    fn open(
        &self,
        bytes: Rc<[u8]>,
        password: Option<String>,
    ) -> LocalBoxFuture<'static, Result<PdfDocument, OpenError>> {
        async move {
            let supplied = password.is_some();
            let params = open_params(&bytes, password.as_deref())
                .map_err(|err| OpenError::Corrupt(error_message(&err)))?;
            let task = get_document(&params).map_err(|err| OpenError::Corrupt(error_message(&err)))?;
            let proxy = JsFuture::from(task.promise())
                .await
                .map_err(|err| open_error(&err, supplied))?;
            Ok(PdfDocument {
                proxy: proxy.unchecked_into(),
            })
        }
        .boxed_local()
    }
}

pub struct PdfDocument {
    proxy: PdfDocumentProxy,
}

impl Document<CanvasSurface> for PdfDocument {
    type Page = PdfPage;

    fn page_count(&self) -> u32 {
        self.proxy.num_pages()
    }

    fn page(&self, number: u32) -> LocalBoxFuture<'static, Result<PdfPage, RenderError>> {
        let promise = self.proxy.get_page(number);
        async move {
            let proxy = JsFuture::from(promise)
                .await
                .map_err(|err| RenderError::new(error_message(&err)))?;
            Ok(PdfPage {
                proxy: proxy.unchecked_into(),
            })
        }
        .boxed_local()
    }

    fn destroy(&self) {
        let _ = self.proxy.destroy();
    }
}

pub struct PdfPage {
    proxy: PdfPageProxy,
}

impl PdfPage {
    fn js_viewport(&self, scale: f64) -> Result<PdfViewport, RenderError> {
        let params = serde_wasm_bindgen::to_value(&ViewportParams { scale })
            .map_err(|err| RenderError::new(err.to_string()))?;
        Ok(self.proxy.get_viewport(&params))
    }

    fn render_params(
        &self,
        surface: &CanvasSurface,
        viewport: PageViewport,
    ) -> Result<JsValue, RenderError> {
        let context = surface
            .context()
            .ok_or_else(|| RenderError::new("canvas 2d context unavailable"))?;
        let js_viewport = self.js_viewport(viewport.scale)?;
        let params = Object::new();
        let set = |key: &str, value: &JsValue| {
            Reflect::set(&params, &JsValue::from_str(key), value)
                .map(|_| ())
                .map_err(|err| RenderError::new(error_message(&err)))
        };
        set("canvasContext", &context)?;
        set("viewport", &js_viewport)?;
        let ratio = surface.pixel_ratio();
        if ratio != 1.0 {
            let transform: Array = [ratio, 0.0, 0.0, ratio, 0.0, 0.0]
                .iter()
                .map(|v| JsValue::from_f64(*v))
                .collect();
            set("transform", &transform)?;
        }
        Ok(params.into())
    }
}

impl Page<CanvasSurface> for PdfPage {
    fn viewport(&self, scale: f64) -> PageViewport {
        match self.js_viewport(scale) {
            Ok(viewport) => PageViewport {
                width: viewport.width(),
                height: viewport.height(),
                scale,
            },
            Err(err) => {
                tracing::warn!(scale, error = %err, "viewport lookup failed");
                PageViewport {
                    width: 0.0,
                    height: 0.0,
                    scale,
                }
            }
        }
    }

    fn render(
        &self,
        surface: &CanvasSurface,
        viewport: PageViewport,
        token: CancelToken,
    ) -> LocalBoxFuture<'static, RenderOutcome> {
        let params = match self.render_params(surface, viewport) {
            Ok(params) => params,
            Err(err) => return futures::future::ready(RenderOutcome::Failed(err)).boxed_local(),
        };
        let task = self.proxy.start_render(&params);
        let done = task.done();
        token.on_cancel(move || task.cancel());
        async move {
            match JsFuture::from(done).await {
                Ok(_) => RenderOutcome::Completed,
                Err(err) if error_name(&err) == "RenderingCancelledException" => {
                    RenderOutcome::Cancelled
                }
                Err(err) => RenderOutcome::Failed(RenderError::new(error_message(&err))),
            }
        }
        .boxed_local()
    }
}
