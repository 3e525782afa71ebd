//! Internal macros for sync/async code unification.
//!
//! `Connection` and `AsyncConnection` share every record-level method body.
//! The only differences between the two are:
//! - `fn` vs `async fn` signatures
//! - `.await` after I/O calls
//! - the transport primitives `io_read` / `io_write_all`
//!
//! Each body macro takes a `$mode` parameter (`sync` or `is_async`) and uses
//! `maybe_await!` to conditionally `.await`. Both connection types keep their
//! transport in `stream` and all protocol state in `core: ConnectionCore`.

/// Conditionally `.await` an expression based on sync/async mode.
///
/// - `maybe_await!(sync, expr)` expands to `expr`
/// - `maybe_await!(is_async, expr)` expands to `expr.await`
macro_rules! maybe_await {
    (sync, $e:expr) => {
        $e
    };
    (is_async, $e:expr) => {
        $e.await
    };
}

// =========================================================================
// Transport framing
// =========================================================================

/// Body for `fill_buf`: read until `read_buf` holds at least `$min_bytes`.
macro_rules! fill_buf_body {
    ($mode:ident, $self:ident, $min_bytes:expr) => {{
        let min = $min_bytes;
        while $self.core.read_buf.len() < min {
            let mut tmp = [0u8; 4096];
            let want = std::cmp::min(tmp.len(), min - $self.core.read_buf.len());
            let n = maybe_await!($mode, $self.io_read(&mut tmp[..want]))?;
            if n == 0 {
                return Err(TlsError::AbruptClose);
            }
            $self.core.read_buf.extend_from_slice(&tmp[..n]);
        }
        Ok(())
    }};
}

/// Body for `read_record`: read, parse and open one record.
///
/// The header is parsed (and its length checked) before any of the body is
/// read from the transport.
macro_rules! read_record_body {
    ($mode:ident, $self:ident) => {{
        maybe_await!($mode, $self.fill_buf(1))?;
        let header_len = RecordHeader::header_len($self.core.read_buf[0])?;
        maybe_await!($mode, $self.fill_buf(header_len))?;
        let header = RecordHeader::parse(&$self.core.read_buf[..header_len])?;
        maybe_await!($mode, $self.fill_buf(header_len + header.length))?;
        let fragment = $self.core.read_buf[header_len..header_len + header.length].to_vec();
        $self.core.read_buf.drain(..header_len + header.length);
        let plaintext = $self.core.record_layer.open_record(&header, fragment)?;
        Ok((header, plaintext))
    }};
}

/// Body for `write_record`: seal one fragment and write it out.
macro_rules! write_record_body {
    ($mode:ident, $self:ident, $content_type:expr, $fragment:expr) => {{
        let record = $self
            .core
            .record_layer
            .seal_record($content_type, $fragment)?;
        maybe_await!($mode, $self.io_write_all(&record))?;
        Ok(())
    }};
}

/// Body for `send_payload`: frame one message into records.
///
/// Under TLS 1.0 with an active block cipher an empty application-data
/// record goes out first, unless `$skip_empty` is set. The payload is then
/// split into `max_fragment_size` pieces; only the first piece of a message
/// is ever preceded by the empty record.
macro_rules! send_payload_body {
    ($mode:ident, $self:ident, $content_type:expr, $payload:expr, $skip_empty:expr) => {{
        let content_type: ContentType = $content_type;
        let payload: &[u8] = $payload;
        if !$skip_empty
            && !$self.core.close_state.is_closed()
            && $self.core.record_layer.needs_empty_fragment()
        {
            maybe_await!(
                $mode,
                $self.write_record(ContentType::ApplicationData, &[])
            )?;
        }
        if content_type == ContentType::Handshake {
            $self.core.handshake_hash.append(payload)?;
        }
        if payload.is_empty() {
            maybe_await!($mode, $self.write_record(content_type, &[]))?;
        }
        let max_frag = $self.core.record_layer.max_fragment_size();
        for fragment in payload.chunks(max_frag) {
            maybe_await!($mode, $self.write_record(content_type, fragment))?;
        }
        Ok(())
    }};
}

/// Body for `send_handshake_flight`: encode and send messages back to back.
/// Only the first message may be preceded by the empty record.
macro_rules! send_handshake_flight_body {
    ($mode:ident, $self:ident, $messages:expr) => {{
        let ctx = $self.core.codec_context();
        let mut skip_empty = false;
        for msg in $messages {
            let bytes = encode_handshake(msg, &ctx)?;
            debug!(msg_type = ?msg.handshake_type(), len = bytes.len(), "sending handshake message");
            maybe_await!(
                $mode,
                $self.send_payload(ContentType::Handshake, &bytes, skip_empty)
            )?;
            skip_empty = true;
        }
        Ok(())
    }};
}

/// Body for `send_alert`.
macro_rules! send_alert_body {
    ($mode:ident, $self:ident, $alert:expr) => {{
        let alert: Alert = $alert;
        debug!(level = %alert.level, description = %alert.description, "sending alert");
        maybe_await!(
            $mode,
            $self.send_payload(ContentType::Alert, &alert.encode(), false)
        )
    }};
}

// =========================================================================
// Receive loop
// =========================================================================

/// Body for `recv_incoming`: next record or handshake message of an
/// expected kind.
///
/// Absorbs empty application-data fragments, peer renegotiation attempts
/// (answered with a `no_renegotiation` warning) and warning alerts. A
/// close_notify or fatal alert ends the loop with `RemoteAlert` unless
/// alerts are themselves expected.
macro_rules! recv_incoming_body {
    ($mode:ident, $self:ident, $expected:expr, $expected_hs:expr) => {{
        let expected: &[ContentType] = $expected;
        let expected_hs: &[HandshakeType] = $expected_hs;
        loop {
            match $self.core.take_buffered(expected, expected_hs)? {
                Some(Buffered::Message(msg)) => return Ok(Incoming::Handshake(msg)),
                Some(Buffered::Renegotiation) => {
                    debug!("refusing renegotiation");
                    maybe_await!(
                        $mode,
                        $self.send_alert(Alert::warning(AlertDescription::NoRenegotiation))
                    )?;
                    continue;
                }
                None => {}
            }

            let (header, payload) = maybe_await!($mode, $self.read_record())?;
            match header.content_type {
                ContentType::ApplicationData if payload.is_empty() => continue,
                ContentType::Handshake if header.ssl2 => {
                    let msg = $self.core.accept_ssl2_hello(&payload, expected_hs)?;
                    return Ok(Incoming::Handshake(msg));
                }
                ContentType::Handshake => {
                    $self.core.handshake_buffer.push_record(&payload)?;
                }
                ContentType::Alert if !expected.contains(&ContentType::Alert) => {
                    let alert = Alert::decode(&payload)?;
                    debug!(level = %alert.level, description = %alert.description, "alert received");
                    let disposition = alert.disposition();
                    if disposition != AlertDisposition::CloseError {
                        // The peer may already be gone.
                        if let Err(e) =
                            maybe_await!($mode, $self.send_alert(Alert::close_notify()))
                        {
                            debug!(error = %e, "close_notify reply not sent");
                        }
                    }
                    match disposition {
                        AlertDisposition::CloseClean => {
                            $self.core.close_state.close_clean();
                        }
                        AlertDisposition::Absorb => {
                            $self.core.clear_resumable();
                            continue;
                        }
                        AlertDisposition::CloseError => {
                            $self.core.close_with_error();
                        }
                    }
                    return Err(TlsError::RemoteAlert {
                        level: alert.level,
                        description: alert.description,
                    });
                }
                ct if expected.contains(&ct) => {
                    if $self.core.handshake_buffer.has_partial() {
                        return Err(TlsError::local(
                            AlertDescription::UnexpectedMessage,
                            "record interleaved with a partial handshake message",
                        ));
                    }
                    return Incoming::from_record(ct, payload);
                }
                ct => {
                    return Err(TlsError::local(
                        AlertDescription::UnexpectedMessage,
                        format!("received content type {}", ct as u8),
                    ));
                }
            }
        }
    }};
}

// =========================================================================
// Failure handling
// =========================================================================

/// Body for `fail`: apply the shutdown policy for an error and return it.
///
/// Locally detected protocol errors are reported to the peer with a fatal
/// alert (send failures ignored). Anything but a clean close clears the
/// session's resumable flag.
macro_rules! fail_body {
    ($mode:ident, $self:ident, $err:expr) => {{
        let err: TlsError = $err;
        match &err {
            TlsError::LocalAlert {
                description,
                message,
            } => {
                if !$self.core.close_state.is_closed() {
                    debug!(description = %description, %message, "fatal local alert");
                    if let Err(e) =
                        maybe_await!($mode, $self.send_alert(Alert::fatal(*description)))
                    {
                        debug!(error = %e, "fatal alert not sent");
                    }
                }
                $self.core.close_with_error();
            }
            TlsError::RemoteAlert { .. } if err.is_close_notify() => {}
            TlsError::AbruptClose if $self.core.config.ignore_abrupt_close => {
                debug!("abrupt close treated as clean");
                $self.core.close_state.close_clean();
            }
            TlsError::ConnectionClosed => {}
            _ => $self.core.close_with_error(),
        }
        err
    }};
}

/// Wrap a fallible operation: refuse re-entry after an abandoned operation,
/// and route errors through `fail`.
macro_rules! guarded_body {
    ($mode:ident, $self:ident, $op:expr) => {{
        $self.core.enter()?;
        let result = match maybe_await!($mode, $op) {
            Ok(v) => Ok(v),
            Err(e) => Err(maybe_await!($mode, $self.fail(e))),
        };
        $self.core.leave();
        result
    }};
}

// =========================================================================
// Public operations
// =========================================================================

/// Body for `send_record`.
macro_rules! send_record_body {
    ($mode:ident, $self:ident, $content_type:expr, $data:expr) => {{
        $self.core.ensure_open()?;
        guarded_body!($mode, $self, $self.send_payload($content_type, $data, false))
    }};
}

/// Body for `send_handshake`.
macro_rules! send_handshake_body {
    ($mode:ident, $self:ident, $messages:expr) => {{
        $self.core.ensure_open()?;
        guarded_body!($mode, $self, $self.send_handshake_flight($messages))
    }};
}

/// Body for `receive`.
macro_rules! receive_body {
    ($mode:ident, $self:ident, $expected:expr, $expected_hs:expr) => {{
        $self.core.ensure_open()?;
        guarded_body!($mode, $self, $self.recv_incoming($expected, $expected_hs))
    }};
}

/// Body for `receive_handshake`.
macro_rules! receive_handshake_body {
    ($mode:ident, $self:ident, $expected_hs:expr) => {{
        match maybe_await!(
            $mode,
            $self.receive(&[ContentType::Handshake], $expected_hs)
        )? {
            Incoming::Handshake(msg) => Ok(msg),
            other => Err(TlsError::local(
                AlertDescription::UnexpectedMessage,
                format!("expected handshake message, got {other:?}"),
            )),
        }
    }};
}

/// Body for `send_finished_flight`: ChangeCipherSpec, activate the pending
/// write state, then Finished under the new keys.
macro_rules! send_finished_flight_body {
    ($mode:ident, $self:ident) => {{
        maybe_await!(
            $mode,
            $self.send_payload(ContentType::ChangeCipherSpec, &[CHANGE_CIPHER_SPEC_BYTE], false)
        )?;
        $self.core.record_layer.activate_write()?;
        let verify_data = $self.core.verify_data($self.core.role)?;
        let finished = HandshakeMessage::Finished(Finished { verify_data });
        let bytes = encode_handshake(&finished, &$self.core.codec_context())?;
        maybe_await!(
            $mode,
            $self.send_payload(ContentType::Handshake, &bytes, false)
        )?;
        debug!(role = ?$self.core.role, "Finished sent");
        Ok(())
    }};
}

/// Body for `get_finished_flight`: ChangeCipherSpec, activate the pending
/// read state, then the peer's Finished, checked against the transcript up
/// to (not including) that message.
macro_rules! get_finished_flight_body {
    ($mode:ident, $self:ident) => {{
        let ccs = maybe_await!(
            $mode,
            $self.recv_incoming(&[ContentType::ChangeCipherSpec], &[])
        )?;
        if let Incoming::ChangeCipherSpec(payload) = ccs {
            $self.core.check_change_cipher_spec(&payload)?;
        }
        $self.core.record_layer.activate_read()?;
        let expected = $self.core.verify_data($self.core.peer_role())?;
        let msg = maybe_await!(
            $mode,
            $self.recv_incoming(&[ContentType::Handshake], &[HandshakeType::Finished])
        )?;
        match msg {
            Incoming::Handshake(HandshakeMessage::Finished(fin))
                if bool::from(fin.verify_data.as_slice().ct_eq(expected.as_slice())) =>
            {
                debug!(role = ?$self.core.role, "peer Finished verified");
                Ok(())
            }
            _ => Err(TlsError::local(
                AlertDescription::DecryptError,
                "Finished verify_data mismatch",
            )),
        }
    }};
}

/// Body for `read_at_least`: buffer application data until `$min` bytes are
/// available (or the connection closes), then hand out up to `buf.len()`.
macro_rules! read_at_least_body {
    ($mode:ident, $self:ident, $buf:ident, $min:expr) => {{
        let min = std::cmp::min($min, $buf.len());
        if $buf.is_empty() {
            return Ok(0);
        }
        $self.core.enter()?;
        while $self.core.app_data.len() < std::cmp::max(min, 1)
            && !$self.core.close_state.is_closed()
        {
            match maybe_await!(
                $mode,
                $self.recv_incoming(&[ContentType::ApplicationData], &[])
            ) {
                Ok(Incoming::ApplicationData(data)) => $self.core.app_data.extend_from_slice(&data),
                Ok(_) => {}
                Err(e) if e.is_close_notify() => break,
                Err(e) => {
                    let err = maybe_await!($mode, $self.fail(e));
                    $self.core.leave();
                    if matches!(err, TlsError::AbruptClose) && $self.core.config.ignore_abrupt_close {
                        break;
                    }
                    return Err(err);
                }
            }
        }
        $self.core.leave();
        if $self.core.app_data.is_empty() {
            return match $self.core.close_state {
                CloseState::ClosedError => Err(TlsError::ConnectionClosed),
                _ => Ok(0),
            };
        }
        let n = std::cmp::min($buf.len(), $self.core.app_data.len());
        $buf[..n].copy_from_slice(&$self.core.app_data[..n]);
        $self.core.app_data.drain(..n);
        Ok(n)
    }};
}

/// Body for `write`: application data in `max_fragment_size` records, with
/// at most one empty record in front of the whole write.
macro_rules! write_body {
    ($mode:ident, $self:ident, $buf:ident) => {{
        $self.core.ensure_open()?;
        if $buf.is_empty() {
            return Ok(0);
        }
        guarded_body!(
            $mode,
            $self,
            $self.send_payload(ContentType::ApplicationData, $buf, false)
        )?;
        Ok($buf.len())
    }};
}

/// Body for `exchange_close_notify`: send close_notify and wait for the
/// peer's, discarding application data in between.
macro_rules! exchange_close_notify_body {
    ($mode:ident, $self:ident) => {{
        maybe_await!($mode, $self.send_alert(Alert::close_notify()))?;
        loop {
            let incoming = maybe_await!(
                $mode,
                $self.recv_incoming(&[ContentType::Alert, ContentType::ApplicationData], &[])
            )?;
            if let Incoming::Alert(alert) = incoming {
                if alert.is_close_notify() {
                    $self.core.close_state.close_clean();
                    debug!("close_notify exchanged");
                    return Ok(());
                }
                return Err(TlsError::RemoteAlert {
                    level: alert.level,
                    description: alert.description,
                });
            }
        }
    }};
}

/// Body for `close`. A peer that drops the transport instead of answering
/// still counts as a clean close.
macro_rules! close_body {
    ($mode:ident, $self:ident) => {{
        if $self.core.close_state.is_closed() {
            return Ok(());
        }
        $self.core.enter()?;
        let result = match maybe_await!($mode, $self.exchange_close_notify()) {
            Ok(()) => Ok(()),
            Err(TlsError::AbruptClose) | Err(TlsError::IoError(_)) => {
                $self.core.close_state.close_clean();
                Ok(())
            }
            Err(e) => Err(maybe_await!($mode, $self.fail(e))),
        };
        $self.core.leave();
        result
    }};
}

/// Body for `send_change_cipher_spec`.
macro_rules! send_change_cipher_spec_body {
    ($mode:ident, $self:ident) => {{
        maybe_await!(
            $mode,
            $self.send_payload(ContentType::ChangeCipherSpec, &[CHANGE_CIPHER_SPEC_BYTE], false)
        )?;
        $self.core.record_layer.activate_write()
    }};
}

/// Body for `receive_change_cipher_spec`.
macro_rules! receive_change_cipher_spec_body {
    ($mode:ident, $self:ident) => {{
        let ccs = maybe_await!(
            $mode,
            $self.recv_incoming(&[ContentType::ChangeCipherSpec], &[])
        )?;
        if let Incoming::ChangeCipherSpec(payload) = ccs {
            $self.core.check_change_cipher_spec(&payload)?;
        }
        $self.core.record_layer.activate_read()
    }};
}

// =========================================================================
// Accessors
// =========================================================================

/// Non-I/O accessor methods shared by both connection types.
macro_rules! impl_connection_accessors {
    ($Name:ident, $($bounds:tt)+) => {
        impl<S: $($bounds)+> $Name<S> {
            /// Protocol version used for records.
            pub fn protocol_version(&self) -> ProtocolVersion {
                self.core.record_layer.version()
            }

            /// Switch the record version (after version negotiation).
            pub fn set_version(&mut self, version: ProtocolVersion) {
                self.core.record_layer.set_version(version);
                self.core.version = Some(version);
            }

            /// Record the negotiated cipher suite (selects message layouts).
            pub fn set_cipher_suite(&mut self, suite: CipherSuite) {
                self.core.cipher_suite = Some(suite);
                if let Ok(mut session) = self.core.session.lock() {
                    session.cipher_suite = Some(suite);
                }
            }

            /// Record the negotiated certificate type.
            pub fn set_certificate_type(&mut self, certificate_type: CertificateType) {
                self.core.certificate_type = certificate_type;
            }

            /// Derive pending states from the session's master secret.
            pub fn calc_pending_states(
                &mut self,
                client_random: &[u8; 32],
                server_random: &[u8; 32],
            ) -> Result<(), TlsError> {
                self.core.calc_pending_states(client_random, server_random)
            }

            pub fn role(&self) -> TlsRole {
                self.core.role
            }

            pub fn session(&self) -> SharedSession {
                self.core.session.clone()
            }

            pub fn close_state(&self) -> CloseState {
                self.core.close_state
            }

            pub fn is_closed(&self) -> bool {
                self.core.close_state.is_closed()
            }

            /// Whether this connection resumed an earlier session.
            pub fn resumed(&self) -> bool {
                self.core.resumed
            }

            pub fn set_resumed(&mut self, resumed: bool) {
                self.core.resumed = resumed;
            }

            /// Bulk cipher name of the negotiated suite.
            pub fn cipher_name(&self) -> Option<&'static str> {
                let suite = self.core.cipher_suite?;
                CipherSuiteParams::from_suite(suite).ok().map(|p| p.bulk.name())
            }

            pub fn record_layer(&self) -> &RecordLayer {
                &self.core.record_layer
            }

            pub fn record_layer_mut(&mut self) -> &mut RecordLayer {
                &mut self.core.record_layer
            }

            pub fn handshake_hash(&self) -> &HandshakeHash {
                &self.core.handshake_hash
            }

            pub fn config(&self) -> &TlsConfig {
                &self.core.config
            }

            /// Borrow the transport.
            pub fn get_ref(&self) -> &S {
                &self.stream
            }

            pub fn get_mut(&mut self) -> &mut S {
                &mut self.stream
            }
        }
    };
}
