/*!
 * Unit tests for provider implementations
 */
